// Console front end
//
// The engine only knows about the ConfirmationGate and EngineObserver traits;
// this module implements both for a terminal.

pub mod console;

pub use console::{ConsoleGate, ConsoleObserver, PromptMode, render_report};
