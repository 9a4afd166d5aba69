//! Decode ARM SWO trace streams into line-oriented text.
//!
//! swotrace reads raw trace output from a trace server or a file, strips the
//! optional TPIU framing, decodes ITM packets and prints one line per event.
//!
//! # Crate Structure
//!
//! - [`transport`]: trace sources (TCP, file)
//! - [`frame`]: TPIU frame decoding and encoding
//! - [`itm`]: ITM packet decoding and encoding
//! - [`pipeline`]: demultiplexing, dispatch and text formatting

/// Re-export transport types.
pub mod transport {
    pub use swotrace_transport::*;
}

/// Re-export TPIU frame types.
pub mod frame {
    pub use swotrace_frame::*;
}

/// Re-export ITM types.
pub mod itm {
    pub use swotrace_itm::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use swotrace_pipeline::*;
}
