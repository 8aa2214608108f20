pub mod bar;
pub mod price_level;
pub mod session;

pub use bar::{Bar, SubBar};
pub use price_level::{PriceLevel, VolumeProfile};
pub use session::SessionWindow;
