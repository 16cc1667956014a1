//! Training record assembly: filtering, truncation, subword ids, sentence
//! boundaries, segment ids and per-token sections.

use longsumm_core::{PreprocessConfig, Result, TrainingRecord};

use crate::tokenizer::{
    SubwordTokenizer, CLS_TOKEN, SEP_TOKEN, TGT_BOS, TGT_EOS, TGT_SENT_SPLIT,
};

/// Separator placed between source sentences before subword tokenization.
fn sentence_joiner() -> String {
    format!(" {} {} ", SEP_TOKEN, CLS_TOKEN)
}

/// Builds `TrainingRecord`s for one tokenizer and configuration.
pub struct BertData<'a> {
    tokenizer: &'a dyn SubwordTokenizer,
    config: &'a PreprocessConfig,
    sep_vid: u32,
    cls_vid: u32,
}

impl<'a> BertData<'a> {
    pub fn new(tokenizer: &'a dyn SubwordTokenizer, config: &'a PreprocessConfig) -> Result<Self> {
        Ok(Self {
            sep_vid: tokenizer.special_id(SEP_TOKEN)?,
            cls_vid: tokenizer.special_id(CLS_TOKEN)?,
            tokenizer,
            config,
        })
    }

    /// Turn a labelled document into a record.
    ///
    /// Returns `Ok(None)` when the document is unusable for training: nothing
    /// survives filtering, or (outside test mode) too few sentences or too
    /// short a target remain. `sections` must have one entry per `src`
    /// sentence; `sent_labels` holds indices into `src`.
    ///
    /// # Panics
    /// When the assembled record violates its length invariants.
    pub fn preprocess(
        &self,
        src: &[Vec<String>],
        sections: &[usize],
        tgt: &[Vec<String>],
        sent_labels: &[usize],
        is_test: bool,
    ) -> Result<Option<TrainingRecord>> {
        let cfg = self.config;
        if !is_test && src.is_empty() {
            return Ok(None);
        }
        assert_eq!(
            src.len(),
            sections.len(),
            "one section index is required per source sentence"
        );

        let idxs: Vec<usize> = src
            .iter()
            .enumerate()
            .filter(|(_, s)| s.len() > cfg.min_src_ntokens_per_sent)
            .map(|(i, _)| i)
            .take(cfg.max_src_nsents)
            .collect();

        let mut full_labels = vec![0u8; src.len()];
        for &l in sent_labels {
            if let Some(slot) = full_labels.get_mut(l) {
                *slot = 1;
            }
        }

        let kept_src: Vec<&[String]> = idxs
            .iter()
            .map(|&i| {
                let sent = &src[i];
                &sent[..sent.len().min(cfg.max_src_ntokens_per_sent)]
            })
            .collect();
        let mut labels: Vec<u8> = idxs.iter().map(|&i| full_labels[i]).collect();
        let kept_sections: Vec<usize> = idxs.iter().map(|&i| sections[i]).collect();

        if kept_src.is_empty() || (!is_test && kept_src.len() < cfg.min_src_nsents) {
            return Ok(None);
        }

        let kept_txt: Vec<String> = kept_src.iter().map(|s| s.join(" ")).collect();
        let text = kept_txt.join(&sentence_joiner());

        let mut src_subtokens = Vec::new();
        src_subtokens.push(CLS_TOKEN.to_string());
        src_subtokens.extend(self.tokenizer.tokenize(&text, false)?);
        src_subtokens.push(SEP_TOKEN.to_string());
        let src_subtoken_idxs = self.tokenizer.convert_tokens_to_ids(&src_subtokens);

        let (segments_ids, token_sections) =
            self.segments_and_sections(&src_subtoken_idxs, &kept_sections);

        let cls_ids: Vec<usize> = src_subtoken_idxs
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == self.cls_vid)
            .map(|(i, _)| i)
            .collect();
        labels.truncate(cls_ids.len());

        let tgt_subtoken = self.target_subtokens(tgt)?;
        if !is_test && tgt_subtoken.len() < cfg.min_tgt_ntokens {
            return Ok(None);
        }
        let tgt_subtoken_idxs = self.tokenizer.convert_tokens_to_ids(&tgt_subtoken);

        let tgt_txt = tgt
            .iter()
            .map(|t| t.join(" "))
            .collect::<Vec<_>>()
            .join("<q>");
        let src_txt: Vec<String> = idxs.iter().map(|&i| src[i].join(" ")).collect();

        assert_eq!(
            token_sections.len(),
            segments_ids.len(),
            "token sections and segment ids do not have the same length"
        );
        assert!(
            kept_sections.len() == labels.len() && labels.len() == cls_ids.len(),
            "preprocessed dimensions do not match: sections={}, labels={}, clss={}",
            kept_sections.len(),
            labels.len(),
            cls_ids.len()
        );

        Ok(Some(TrainingRecord {
            src: src_subtoken_idxs,
            tgt: tgt_subtoken_idxs,
            src_sent_labels: labels,
            segs: segments_ids,
            clss: cls_ids,
            src_txt,
            tgt_txt,
            sections: kept_sections,
            token_sections,
        }))
    }

    /// Segment id (sentence parity) and section index for every subtoken.
    ///
    /// Sentence spans run up to and including their `[SEP]`.
    fn segments_and_sections(&self, ids: &[u32], sections: &[usize]) -> (Vec<u8>, Vec<usize>) {
        let mut segments_ids = Vec::with_capacity(ids.len());
        let mut token_sections = Vec::with_capacity(ids.len());

        let mut prev_end: isize = -1;
        let sep_positions = ids
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == self.sep_vid)
            .map(|(i, _)| i as isize);
        for (i, sep) in sep_positions.enumerate() {
            let span = (sep - prev_end) as usize;
            prev_end = sep;
            let seg = (i % 2) as u8;
            segments_ids.extend(std::iter::repeat(seg).take(span));
            token_sections.extend(std::iter::repeat(sections[i]).take(span));
        }
        (segments_ids, token_sections)
    }

    /// `[unused0] t0 [unused2] t1 ... [unused1]`, cut to `max_tgt_ntokens`.
    fn target_subtokens(&self, tgt: &[Vec<String>]) -> Result<Vec<String>> {
        let basic = self.config.use_bert_basic_tokenizer;
        let mut pieces = Vec::with_capacity(tgt.len());
        for sent in tgt {
            pieces.push(self.tokenizer.tokenize(&sent.join(" "), basic)?.join(" "));
        }
        let joined = format!(
            "{} {} {}",
            TGT_BOS,
            pieces.join(&format!(" {} ", TGT_SENT_SPLIT)),
            TGT_EOS
        );
        Ok(joined
            .split_whitespace()
            .take(self.config.max_tgt_ntokens)
            .map(str::to_string)
            .collect())
    }
}
