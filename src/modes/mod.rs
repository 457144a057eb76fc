pub mod headless;

pub use headless::{HeadlessMode, HeadlessOptions};
