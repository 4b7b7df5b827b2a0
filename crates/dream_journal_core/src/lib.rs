pub mod domain;
pub mod ports;

pub use domain::{
    Dream, DreamAnalysis, DreamUpdate, DreamWithRelations, ImageGeneration, Insights,
    Interpretation, NewDream, NewUser, SortOrder, User, UserCredentials, VisualStyle,
};
pub use ports::{
    DatabaseService, DreamAnnotationService, DreamInterpretationService, ImageGenerationService,
    PortError, PortResult, SpeechToTextService, Transcript,
};
