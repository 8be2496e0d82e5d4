//! End-to-end properties of segmentation and packing.

use lexchunk::prelude::*;
use lexchunk::{HybridChunker, ParagraphChunker, SlidingWindowChunker};
use pretty_assertions::assert_eq;

const SENTENZA: &str = "Con ricorso depositato il 12 marzo 2019 la società Alfa s.r.l. \
conveniva in giudizio il sig. Rossi. Chiedeva la condanna al pagamento della somma di \
euro 15.000, oltre interessi e rivalutazione, ai sensi dell'art. 1224 c.c. Il convenuto, \
costituitosi tardivamente, eccepiva la prescrizione del credito; in subordine chiedeva la \
riduzione della penale ex art. 1384 c.c., richiamando la giurisprudenza di legittimità \
(Cass. civ., sez. III, n. 4567/2015). Il Tribunale osserva quanto segue. La domanda è \
fondata e va accolta nei limiti di seguito indicati! Quanto alla prescrizione, il termine \
decennale di cui all'art. 2946 c.c. non era decorso al momento della notifica. Restano \
assorbite le ulteriori questioni. 3. Le spese seguono la soccombenza e si liquidano come \
da dispositivo, tenuto conto del d.m. 55/2014 e successive modifiche. P.Q.M. il Tribunale \
accoglie la domanda e condanna il convenuto al pagamento della somma indicata in \
motivazione, oltre accessori di legge.";

/// A sentence of exactly `words` word tokens.
fn sentence(words: usize) -> String {
    let mut s = vec!["parola"; words].join(" ");
    s.replace_range(0..1, "P");
    s.push('.');
    s
}

fn paragraph(min: usize, max: usize) -> ParagraphChunker {
    ParagraphChunker::new(ChunkerConfig::paragraph().with_sizes(min, max)).unwrap()
}

fn sliding(min: usize, max: usize, overlap: usize) -> SlidingWindowChunker {
    SlidingWindowChunker::new(
        ChunkerConfig::sliding_window()
            .with_sizes(min, max)
            .with_overlap(overlap),
    )
    .unwrap()
}

fn hybrid(min: usize, max: usize, overlap: usize) -> HybridChunker {
    HybridChunker::new(ChunkerConfig::hybrid().with_sizes(min, max).with_overlap(overlap))
        .unwrap()
}

#[test]
fn primary_chunks_reassemble_sentences() {
    let chunkers: Vec<Box<dyn Chunker>> = vec![
        Box::new(paragraph(100, 300)),
        Box::new(hybrid(10, 40, 15)),
    ];

    for chunker in chunkers {
        let sentences = SentenceSegmenter::from_config(chunker.config()).segment(SENTENZA);
        let primaries: Vec<Chunk> = chunker
            .chunk(SENTENZA)
            .into_iter()
            .filter(|c| !c.is_overlap())
            .collect();
        assert!(primaries.len() > 1, "{} produced a single chunk", chunker.name());

        let mut next = 0;
        let mut rebuilt = Vec::new();
        for chunk in &primaries {
            let (start, end) = chunk.metadata.sentence_span.unwrap();
            assert_eq!(start, next, "gap or duplicate in {}", chunker.name());
            assert_eq!(chunk.text, sentences[start..end].join(chunker.config().mode.joiner()));
            rebuilt.extend_from_slice(&sentences[start..end]);
            next = end;
        }
        assert_eq!(rebuilt, sentences);
    }
}

#[test]
fn sliding_windows_cover_every_sentence() {
    let chunker = sliding(50, 200, 80);
    let sentences = SentenceSegmenter::from_config(chunker.config()).segment(SENTENZA);
    let chunks = chunker.chunk(SENTENZA);

    let mut covered = vec![false; sentences.len()];
    let mut last_start = None;
    for chunk in &chunks {
        let (start, end) = chunk.metadata.sentence_span.unwrap();
        assert!(last_start.map_or(true, |s| start > s), "windows must advance");
        last_start = Some(start);
        covered[start..end].iter_mut().for_each(|c| *c = true);
    }
    assert!(covered.into_iter().all(|c| c));
}

#[test]
fn character_chunks_stay_within_budget() {
    let chunkers: Vec<Box<dyn Chunker>> = vec![
        Box::new(paragraph(100, 300)),
        Box::new(paragraph(20, 120)),
        Box::new(sliding(100, 300, 60)),
        Box::new(sliding(20, 120, 30)),
    ];

    for chunker in chunkers {
        let max = chunker.config().max_chunk_size;
        for chunk in chunker.chunk(SENTENZA) {
            assert!(
                chunk.char_count <= max,
                "{} chunk of {} chars exceeds {}: {}",
                chunker.name(),
                chunk.char_count,
                max,
                chunk.text
            );
        }
    }
}

#[test]
fn min_close_to_max_is_rejected_or_bounded() {
    // Twelve sentences of exactly 40 characters
    let sentence = "Il ricorrente deposita la memoria breve.";
    assert_eq!(sentence.chars().count(), 40);
    let text = vec![sentence; 12].join(" ");

    assert!(matches!(
        ParagraphChunker::new(ChunkerConfig::paragraph().with_sizes(90, 100)),
        Err(ConfigError::MinAboveHalfMax { .. })
    ));
    assert!(SlidingWindowChunker::new(
        ChunkerConfig::sliding_window()
            .with_sizes(90, 100)
            .with_overlap(20)
    )
    .is_err());

    let chunkers: Vec<Box<dyn Chunker>> =
        vec![Box::new(paragraph(50, 100)), Box::new(sliding(50, 100, 20))];
    for chunker in chunkers {
        let chunks = chunker.chunk(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(
                chunk.char_count <= 100,
                "{} chunk {} has {} chars",
                chunker.name(),
                chunk.index,
                chunk.char_count
            );
        }
        let last = chunks.len() - 1;
        assert!(chunks[..last].iter().all(|c| c.char_count >= 50));
    }
}

#[test]
fn legal_abbreviations_do_not_end_sentences() {
    let text = "Vedi art. 1414 c.c. Il contratto è valido.";

    let sentences = SentenceSegmenter::new().segment(text);
    assert_eq!(sentences, vec!["Vedi art. 1414 c.c.", "Il contratto è valido."]);

    let chunks = paragraph(1, 1000).chunk(text);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].metadata.sentence_span, Some((0, 2)));
}

#[test]
fn empty_input_yields_nothing() {
    let segmenter = SentenceSegmenter::new();
    assert!(segmenter.segment("").is_empty());
    assert!(segmenter.segment("   ").is_empty());

    let router = ChunkingRouter::new(&ChunkingSettings::default()).unwrap();
    for (name, _) in router.list_chunkers() {
        let chunker = router.get_chunker_by_name(name).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\t ").is_empty());
    }
}

#[test]
fn unbroken_token_still_chunks() {
    let text = "x".repeat(10_000);
    let router = ChunkingRouter::new(&ChunkingSettings::default()).unwrap();

    for mode in ChunkMode::ALL {
        let chunker = router.get_chunker(mode);
        let chunks = chunker.chunk(&text);
        assert!(!chunks.is_empty(), "{} produced no chunks", chunker.name());

        let total: usize = chunks
            .iter()
            .filter(|c| !c.is_overlap())
            .map(|c| c.char_count)
            .sum();
        if mode == ChunkMode::Paragraph || mode == ChunkMode::HybridTokenBudget {
            assert_eq!(total, 10_000);
        }
        if !mode.is_token_budget() {
            assert!(chunks.iter().all(|c| c.char_count <= chunker.config().max_chunk_size));
        }
    }
}

#[test]
fn short_overlap_chunks_are_omitted() {
    // Primaries of three 20-token sentences; one sentence per side gives 40 tokens
    let text = vec![sentence(20); 6].join(" ");
    let chunks = hybrid(50, 60, 10).chunk(&text);

    assert_eq!(chunks.len(), 2);
    assert!(chunks.iter().all(|c| !c.is_overlap()));
    assert!(chunks.iter().all(|c| c.token_count >= 50));

    // Two sentences per side reach the floor and are kept
    let chunks = hybrid(50, 60, 40).chunk(&text);
    let overlaps: Vec<&Chunk> = chunks.iter().filter(|c| c.is_overlap()).collect();
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].index, 1);
    assert_eq!(overlaps[0].token_count, 80);
}

#[test]
fn chunking_is_deterministic() {
    let settings = ChunkingSettings::default();

    for mode in ChunkMode::ALL {
        let first = ChunkingRouter::new(&settings).unwrap().get_chunker(mode);
        let second = ChunkingRouter::new(&settings).unwrap().get_chunker(mode);

        let a = serde_json::to_string(&first.chunk(SENTENZA)).unwrap();
        let b = serde_json::to_string(&first.chunk(SENTENZA)).unwrap();
        let c = serde_json::to_string(&second.chunk(SENTENZA)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }
}

#[tokio::test]
async fn batch_matches_direct_chunking() {
    let settings = ChunkingSettings::default();
    let router = std::sync::Arc::new(ChunkingRouter::new(&settings).unwrap());
    let processor = BatchProcessor::new(
        router.clone(),
        BatchConfig {
            concurrency: settings.max_concurrent_documents,
            ..Default::default()
        },
    );

    let documents = vec![
        Document::new("a", SENTENZA),
        Document::new("b", SENTENZA).with_mode(ChunkMode::Paragraph),
    ];
    let (results, summary) = processor.process_batch(documents).await.unwrap();
    assert_eq!(summary.processed_documents, 2);

    let direct = router.get_chunker(ChunkMode::Paragraph).chunk(SENTENZA);
    let texts: Vec<&str> = results[1].chunks.iter().map(|c| c.text.as_str()).collect();
    let expected: Vec<&str> = direct.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, expected);
}
