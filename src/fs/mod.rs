pub mod artifacts;
pub mod locking;
pub mod permissions;

pub use artifacts::{
    find_readmes, read_manifest, sync_stage, write_file_list, write_manifest, CurationManifest,
    FILE_LIST_FILE,
};
pub use permissions::{
    normalize, normalize_or_warn, normalize_tree, normalize_tree_with, TreeModes, DIR_MODE,
    FILE_MODE, READ_ONLY_MODE,
};
