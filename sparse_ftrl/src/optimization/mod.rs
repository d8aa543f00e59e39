mod ftrl;

pub use ftrl::{Ftrl, FtrlSlotsMut};
