//! Custom Resource Definitions consumed by Seedbed
//!
//! Only the resources the bootstrap compiler reads are defined here.

mod operating_system_config;

pub use operating_system_config::{
    DropIn, File, FileContent, FileContentInline, FileContentSecretRef, OperatingSystemConfig,
    OperatingSystemConfigSpec, Unit,
};
