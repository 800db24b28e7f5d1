//! Mirroring-tool integration
//!
//! The full-site mirror and every single-page fetch go through wget (or a
//! configured compatible program). This module owns the argument sets, exit
//! status policy and the post-mirror merge of domain-variant trees.

mod merge;
mod wget;

pub use merge::{merge_domain_variants, merge_trees, MergeReport};
pub use wget::{
    classify_exit, mirror_args, mirror_site, page_args, ExitClass, MirrorMode, WgetFetcher,
};
