//! Core capability plugins: logging, utilities, settings, notifications

pub mod logger;
pub mod notifications;
pub mod settings;
pub mod utilities;

pub use logger::{LogApi, LoggerPlugin};
pub use notifications::{
    NotificationSink, NotificationsApi, NotificationsPlugin, TracingSink,
    NOTIFICATIONS_ENABLED_SETTING,
};
pub use settings::{SettingsApi, SettingsPlugin};
pub use utilities::{OpTimer, UtilitiesApi, UtilitiesPlugin};
