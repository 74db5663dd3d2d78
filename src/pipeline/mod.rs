pub mod episode;
pub mod folder;

#[cfg(test)]
mod episode_tests;

pub use episode::{
    CurationCallback,
    EpisodeProcessor,
    ProcessOptions,
};
pub use folder::FolderProcessor;
