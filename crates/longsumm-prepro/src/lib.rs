//! LongSumm Prepro: ROUGE oracle labelling, training record assembly,
//! corpus readers, split assignment and sharded worker-pool pipelines.

pub mod bert_data;
pub mod corenlp;
pub mod formats;
pub mod greedy;
pub mod pipeline;
pub mod pool;
pub mod rouge;
pub mod shard;
pub mod split;
pub mod text;
pub mod tokenizer;

pub use bert_data::BertData;
pub use greedy::{greedy_selection, greedy_selection_trace, GreedySelection};
pub use pipeline::{
    build_record, format_paper_to_lines, format_to_bert, format_to_lines, format_xsum_to_lines,
    PipelineReport, SplitReport,
};
pub use pool::WorkerPool;
pub use rouge::{cal_rouge, RougeScore};
pub use shard::{ShardNaming, ShardSummary, ShardWriter};
pub use split::{hashhex, CorpusMapping};
pub use tokenizer::{BertTokenizer, SubwordTokenizer};
