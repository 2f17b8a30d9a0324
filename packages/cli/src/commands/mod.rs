pub mod apply;
pub mod init;
pub mod open;
pub mod replay;
pub mod save;
pub mod sync;
pub mod view;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use open::{open, OpenArgs};
pub use replay::{replay, ReplayArgs};
pub use save::{save, SaveArgs};
pub use sync::{sync, SyncArgs};
pub use view::{view, ViewArgs};
