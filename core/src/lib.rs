pub mod error;
pub mod lda;
pub mod normalize;
pub mod persist;
pub mod report;
pub mod timeline;
pub mod vocab;

pub use error::{Error, Mismatch, Result};
pub use lda::{CancelFlag, InferenceSchedule, Inferencer, LdaConfig, TopicModel, Trainer};
pub use normalize::{Normalizer, Step};
pub use timeline::Histogram;
pub use vocab::{encode, EncodedDocument, StopwordList, Stopwords, Vocabulary};

pub type WordId = u32;
pub type TopicId = usize;
