//! Log targets used by node selection.

/// Target names for log filtering.
pub mod targets {
    /// S-NAPTR node selection.
    pub const SELECTOR: &str = "epcdns_select::selector";
    /// Diameter peer selection.
    pub const DIAMETER: &str = "epcdns_select::diameter";
}
