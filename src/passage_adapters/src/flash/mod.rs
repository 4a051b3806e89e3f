pub mod session_flash;

pub use session_flash::SessionFlash;
