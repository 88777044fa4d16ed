pub mod fingerprint;
pub mod matcher;
pub mod reference_set;
