pub mod crm;
pub mod hw;
pub mod interface;

pub use crm::CrmScraper;
pub use hw::HwScraper;
pub use interface::InterfaceScraper;
