//! The full extractive encoder: auxiliary embeddings, document encoder,
//! the long-attention stack and the scoring head.

use ndarray::{s, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use longsumm_core::{Error, ModelConfig, Result, TrainingRecord};

use crate::document::DocumentEncoder;
use crate::extractor::{AuxEmbeddings, SentenceExtractor};
use crate::layer::LongEncoderLayer;
use crate::layers::{sigmoid, Embedding, LayerNorm};
use crate::mask::{AttentionMask, MASKED_VALUE};
use crate::positional::PositionalEncoding;

/// One batch of sentence vectors with their per-sentence metadata.
#[derive(Debug, Clone)]
pub struct ExtractorInput {
    /// `[batch, seq, hidden]`, one vector per sentence slot.
    pub sent_vecs: Array3<f32>,
    /// `[batch, seq]` extended mask: negative padding, zero local, positive global.
    pub mask: Array2<f32>,
    /// `[batch, seq]` section index per sentence.
    pub sections: Array2<usize>,
    /// `[batch, seq]` subtoken count per sentence.
    pub lengths: Array2<usize>,
}

impl ExtractorInput {
    /// Every slot local, sections and lengths zero.
    pub fn new(sent_vecs: Array3<f32>) -> Self {
        let (batch, seq, _) = sent_vecs.dim();
        Self {
            sent_vecs,
            mask: Array2::zeros((batch, seq)),
            sections: Array2::zeros((batch, seq)),
            lengths: Array2::zeros((batch, seq)),
        }
    }

    /// Build a batch from training records and their sentence vectors.
    /// Slots past a record's sentence count are padding.
    pub fn from_records(records: &[TrainingRecord], sent_vecs: Array3<f32>) -> Result<Self> {
        let (batch, seq, _) = sent_vecs.dim();
        if records.len() != batch {
            return Err(Error::Internal(format!(
                "{} records for a batch of {}",
                records.len(),
                batch
            )));
        }
        let mut input = Self::new(sent_vecs);
        input.mask.fill(MASKED_VALUE);
        for (b, record) in records.iter().enumerate() {
            let n = record.num_sentences();
            if n > seq {
                return Err(Error::Internal(format!(
                    "record {} has {} sentences but the batch holds {}",
                    b, n, seq
                )));
            }
            input.mask.slice_mut(s![b, ..n]).fill(0.0);
            for (i, (&section, length)) in record
                .sections
                .iter()
                .zip(record.sentence_lengths())
                .enumerate()
            {
                input.sections[[b, i]] = section;
                input.lengths[[b, i]] = length;
            }
        }
        Ok(input)
    }

    pub fn dim(&self) -> (usize, usize) {
        self.mask.dim()
    }
}

/// Long-attention extractive encoder.
#[derive(Debug, Clone)]
pub struct LongExtEncoder {
    config: ModelConfig,
    pos_encoding: PositionalEncoding,
    section_embeddings: Embedding,
    position_embeddings: Embedding,
    length_embeddings: Embedding,
    document: DocumentEncoder,
    layers: Vec<LongEncoderLayer>,
    layer_norm: LayerNorm,
    extractor: SentenceExtractor,
}

impl LongExtEncoder {
    /// Validate `config` and draw every parameter from `config.seed`.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        let dim = config.hidden_size;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let encoder = Self {
            config: config.clone(),
            pos_encoding: PositionalEncoding::new(dim, config.max_position_embeddings),
            section_embeddings: Embedding::init(config.section_size, dim, &mut rng),
            position_embeddings: Embedding::init(config.position_table_size, dim, &mut rng),
            length_embeddings: Embedding::init(config.length_buckets, dim, &mut rng),
            document: DocumentEncoder::init(dim, &mut rng),
            layers: (0..config.num_hidden_layers)
                .map(|_| LongEncoderLayer::init(config, &mut rng))
                .collect(),
            layer_norm: LayerNorm::new(dim, config.layer_norm_eps),
            extractor: SentenceExtractor::init(dim, &mut rng),
        };
        debug!(
            "Built encoder: {} layers, hidden {}, {} heads, window {}",
            config.num_hidden_layers,
            dim,
            config.num_attention_heads,
            config.attention_window
        );
        Ok(encoder)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Sentence logits `[batch, n]`, where `n` is the longest unpadded row.
    /// Logits in padded slots carry no meaning.
    pub fn forward(&self, input: &ExtractorInput) -> Array2<f32> {
        let (batch, seq, dim) = input.sent_vecs.dim();
        assert_eq!(dim, self.config.hidden_size, "sentence vector width mismatch");
        assert_eq!(input.dim(), (batch, seq), "mask shape mismatch");
        assert_eq!(input.sections.dim(), (batch, seq), "section shape mismatch");
        assert_eq!(input.lengths.dim(), (batch, seq), "length shape mismatch");

        let mask = AttentionMask::from_extended(&input.mask);
        let valid = mask.valid().insert_axis(Axis(2));
        let embedded = &input.sent_vecs * &valid;
        let mut x = self.pos_encoding.forward(&embedded);
        // The document vector pools the position-encoded sentence vectors.
        let doc = self.document.forward(&x, &mask);

        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(i, &x, &mask);
        }

        let n = mask.valid_counts().into_iter().max().unwrap_or(0);
        let x = self
            .layer_norm
            .forward(&x.slice(s![.., ..n, ..]).to_owned());

        let positions = Array2::from_shape_fn((batch, n), |(_, i)| i);
        let position = self.position_embeddings.forward(&positions.view());
        let section = self
            .section_embeddings
            .forward(&input.sections.slice(s![.., ..n]));
        let length = self
            .length_embeddings
            .forward(&input.lengths.slice(s![.., ..n]));

        self.extractor.forward(
            &x,
            &doc,
            &AuxEmbeddings {
                position: &position,
                section: &section,
                length: &length,
            },
        )
    }

    /// Inclusion probabilities `[batch, n]`; padded slots are zero.
    pub fn predict(&self, input: &ExtractorInput) -> Array2<f32> {
        let logits = self.forward(input);
        let n = logits.ncols();
        let valid = AttentionMask::from_extended(&input.mask).truncate(n).valid();
        logits.mapv_into(sigmoid) * &valid
    }
}
