pub mod health;
pub use self::health::health;

pub mod logout;
pub use self::logout::logout;

pub mod proxy;
pub use self::proxy::proxy;
