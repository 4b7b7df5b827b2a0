pub mod annotator;
pub mod audio_store;
pub mod db;
pub mod image_gen;
pub mod interpret_llm;
pub mod memory;
pub mod sst;

pub use annotator::KeywordAnnotator;
pub use audio_store::AudioStore;
pub use db::DbAdapter;
pub use image_gen::OpenAiImageAdapter;
pub use interpret_llm::OpenAiInterpretationAdapter;
pub use memory::InMemoryStore;
pub use sst::OpenAiSstAdapter;
