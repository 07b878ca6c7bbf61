#![doc = include_str!("../README.md")]

mod error;
mod types;
mod config;
mod textio;
mod realign;
mod layout;
mod gather;
mod manifest;
mod pipeline;
mod generation;

pub use self::error::RealignError;
pub use self::error::Result;

pub use self::types::Shape;
pub use self::types::RealignConfig;
pub use self::types::DEFAULT_ALIGN;

pub use self::config::DEFAULT_CONFIG_PATH;

pub use self::textio::{read_indices, read_values, write_values};

pub use self::realign::{
    Group,
    assemble_groups,
    chw_from_values,
    pad_and_permute,
    pad_and_permute_aligned,
    restore,
    split_groups,
    split_groups_aligned,
};

pub use self::layout::{aligned_dims, array_from_values, channel_axis, from_aligned, to_aligned};

pub use self::gather::{gather_chw, gather_hwc};

pub use self::manifest::{Manifest, MANIFEST_FILE, merge, write_group};

pub use self::pipeline::{run, restore_file};

pub use self::generation::{
    Fixture,
    ValueDistribution,
    default_fixtures,
    generate_fixtures,
    generate_index_file,
    generate_tensor_file,
};
