//! Browser connection: probe-or-launch choice, Chrome launching, and the
//! CDP (Chrome DevTools Protocol) client driving the page.

pub mod cdp;
pub mod chooser;
pub mod config;
pub mod launcher;
pub mod port;

pub use cdp::CdpClient;
pub use chooser::choose_connect_config;
pub use config::{ConnectConfig, LaunchConfig, WindowSize};
pub use port::allocate_cdp_port;
