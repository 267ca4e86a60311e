mod enigo_injector;
mod hub;
mod injector;
mod system_listener;

pub use {
    enigo_injector::EnigoInjector,
    hub::{InputChannel, InputHub, RawInputEvent, SubscriptionId},
    injector::{InputInjector, KeyboardInjector, MouseInjector},
    system_listener::system_hub,
};
