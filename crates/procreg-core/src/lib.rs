pub mod error;
pub mod index;
pub mod process;
pub mod time;

pub use error::{CoreError, Result};
pub use index::{IndexDescriptor, IndexInfo, IndexOutcome, IndexType};
pub use process::{ProcessDocument, ProcessState, StateChange};
pub use time::{format_rfc3339, now_utc};
