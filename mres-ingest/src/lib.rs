//! mres-ingest library interface
//!
//! Enriches the metadata store from a music tree:
//! tags → MusicBrainz lookup → aggregation → track record → descriptor.

pub mod aggregator;
pub mod descriptor;
pub mod ingest;
pub mod musicbrainz;
pub mod scanner;
pub mod tags;

pub use aggregator::{Diagnostics, MetadataAggregator, Resolution, ResolveOutcome};
pub use descriptor::{DescriptorBuilder, EmbeddingFunction, OllamaEmbedder};
pub use ingest::{IngestOptions, IngestOutcome, Ingestor, RunSummary};
pub use musicbrainz::{MetadataLookup, MusicBrainzClient};
pub use tags::{Id3TagReader, TagReader};
