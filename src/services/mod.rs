pub mod action_queue;
pub mod detection_loop;
pub mod dispatcher;
pub mod hotkey_listener;
pub mod keycode_map;
pub mod pause_controller;
pub mod session_context;
pub mod virtual_device;

pub use action_queue::ActionQueue;
pub use detection_loop::{DetectionLoop, LoopTiming};
pub use dispatcher::{ActionDispatcher, KeyPolicy};
pub use hotkey_listener::create_hotkey_listener;
pub use pause_controller::PauseController;
pub use session_context::{SessionContext, SessionState};
pub use virtual_device::{KeyPresser, VirtualDevice};
