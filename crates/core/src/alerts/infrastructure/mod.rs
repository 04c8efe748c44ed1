pub mod notification_dispatcher;
pub mod telegram_notifier;
