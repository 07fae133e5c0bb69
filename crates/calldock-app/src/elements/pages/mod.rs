//! Page elements, one per [`crate::pages::PageId`].

pub mod app_info;
pub mod call;
pub mod call_log;
pub mod dial;
pub mod index;
pub mod login;
pub mod settings;

pub use app_info::AppInfoView;
pub use call::CallView;
pub use call_log::CallLogView;
pub use dial::DialView;
pub use index::IndexView;
pub use login::LoginView;
pub use settings::SettingsView;
