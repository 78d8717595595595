pub mod system;

pub use system::System;
