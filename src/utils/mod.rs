pub mod format;
pub mod http;
pub mod json_block;
pub mod logging;
pub mod timing;
