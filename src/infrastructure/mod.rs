pub mod cdp_page;
pub mod page_driver;

pub use cdp_page::CdpPage;
pub use page_driver::{ElementState, Key, PageDriver};
