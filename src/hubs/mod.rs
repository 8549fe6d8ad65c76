//! Hub scoring: degree-censored participation percentiles and hub flagging

pub mod centrality;
pub mod labeler;

pub use centrality::{average_percentiles, censored_pc_percentiles};
pub use labeler::hub_indices;
