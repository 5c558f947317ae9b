pub mod order_notifier;

pub use order_notifier::OrderNotifier;
