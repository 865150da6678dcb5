use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ndarray::ArrayView2;
use rstest::rstest;
use toxicity_inference::{
    Classification, InferenceConfig, ModelError, PredictError, Predictor, SequenceModel,
};
use toxicity_pre_processing::pre_processor::{
    NormalizationConfig, PAD_ID, PaddingSide, Vocabulary,
};

/// Scores each row by the share of `toxic_ids` among its non-pad ids and
/// records every batch it sees.
#[derive(Default)]
struct RecordingModel {
    toxic_ids: Vec<u32>,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<Vec<u32>>>>,
}

impl RecordingModel {
    fn with_toxic_ids(ids: &[u32]) -> Self {
        Self {
            toxic_ids: ids.to_vec(),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_batch(&self) -> Vec<Vec<u32>> {
        self.batches.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl SequenceModel for RecordingModel {
    fn sequence_length(&self) -> Option<usize> {
        None
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let rows = batch
            .outer_iter()
            .map(|row| row.to_vec())
            .collect::<Vec<_>>();
        let scores = rows
            .iter()
            .map(|row| {
                let words = row.iter().filter(|&&id| id != PAD_ID).count();
                if words == 0 {
                    return 0.0;
                }
                let toxic = row.iter().filter(|id| self.toxic_ids.contains(id)).count();
                toxic as f32 / words as f32
            })
            .collect();
        self.batches.lock().unwrap().push(rows);
        Ok(scores)
    }
}

struct FixedScore(f32);

impl SequenceModel for FixedScore {
    fn sequence_length(&self) -> Option<usize> {
        None
    }

    fn predict(&self, batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        Ok(vec![self.0; batch.nrows()])
    }
}

struct FailingModel;

impl SequenceModel for FailingModel {
    fn sequence_length(&self) -> Option<usize> {
        None
    }

    fn predict(&self, _batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        Err(ModelError::Backend("session crashed".to_owned()))
    }
}

struct ShortOutput;

impl SequenceModel for ShortOutput {
    fn sequence_length(&self) -> Option<usize> {
        None
    }

    fn predict(&self, _batch: ArrayView2<'_, u32>) -> Result<Vec<f32>, ModelError> {
        Ok(vec![0.3])
    }
}

fn vocabulary() -> Vocabulary {
    Vocabulary::from_word_index([
        ("you", 1),
        ("are", 2),
        ("an", 3),
        ("idiot", 4),
        ("nice", 5),
        ("text", 6),
        ("is", 7),
        ("happy", 8),
        ("not", 9),
    ])
}

#[test]
fn batch_with_empty_text_keeps_order() {
    let model = Arc::new(RecordingModel::with_toxic_ids(&[4]));
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model)).unwrap();

    let results = predictor.predict_batch(&["", "text"]).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].original_text, "");
    assert_eq!(results[1].original_text, "text");
    assert!(!results[0].is_toxic);
    let batch = model.last_batch();
    assert!(batch[0].iter().all(|&id| id == PAD_ID));
    assert_eq!(batch[1][0], 6);
}

#[test]
fn score_of_exactly_half_is_toxic() {
    let predictor = Predictor::new(vocabulary(), FixedScore(0.5)).unwrap();
    let result = predictor.predict("you are nice").unwrap();
    assert!(result.is_toxic);
    assert_eq!(result.classification(), Classification::Toxic);
    assert!((result.toxicity_score - 0.5).abs() < f32::EPSILON);
}

#[rstest]
#[case(0.49, 0.5, Classification::NonToxic)]
#[case(0.5, 0.5, Classification::Toxic)]
#[case(0.7, 0.8, Classification::NonToxic)]
#[case(0.8, 0.8, Classification::Toxic)]
fn custom_thresholds(
    #[case] score: f32,
    #[case] threshold: f32,
    #[case] expected: Classification,
) {
    let predictor = Predictor::new(vocabulary(), FixedScore(score))
        .unwrap()
        .with_threshold(threshold)
        .unwrap();
    assert_eq!(predictor.classify("you are nice").unwrap(), expected);
}

#[rstest]
#[case(f32::NAN)]
#[case(1.5)]
#[case(-0.5)]
fn out_of_range_threshold_is_a_configuration_error(#[case] threshold: f32) {
    let err = Predictor::new(vocabulary(), FixedScore(0.5))
        .unwrap()
        .with_threshold(threshold)
        .err()
        .expect("invalid threshold accepted");
    assert!(matches!(err, PredictError::Configuration(_)));
}

#[test]
fn model_is_called_once_per_batch() {
    let model = Arc::new(RecordingModel::with_toxic_ids(&[4]));
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model)).unwrap();
    let texts = (0..250)
        .map(|i| if i % 3 == 0 { "you idiot" } else { "you are nice" })
        .collect::<Vec<_>>();

    let results = predictor.predict_batch(&texts).unwrap();

    assert_eq!(model.calls(), 1);
    assert_eq!(results.len(), 250);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.original_text, texts[i]);
        assert_eq!(result.is_toxic, i % 3 == 0);
    }
}

#[test]
fn model_sees_normalized_and_padded_input() {
    let model = Arc::new(RecordingModel::default());
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model))
        .unwrap()
        .with_max_sequence_length(8)
        .unwrap();

    predictor
        .predict("<p>You're <b>NOT</b> nice :-)</p>")
        .unwrap();

    // "you are not nice happy"
    assert_eq!(model.last_batch(), vec![vec![1, 2, 9, 5, 8, 0, 0, 0]]);
}

#[test]
fn pre_padding_reaches_the_model() {
    let model = Arc::new(RecordingModel::default());
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model))
        .unwrap()
        .with_max_sequence_length(4)
        .unwrap()
        .with_padding(PaddingSide::Pre);

    predictor.predict("you are an idiot you are nice").unwrap();
    assert_eq!(model.last_batch(), vec![vec![4, 1, 2, 5]]);

    predictor.predict("nice text").unwrap();
    assert_eq!(model.last_batch(), vec![vec![0, 0, 5, 6]]);
}

#[test]
fn normalization_can_be_switched_off() {
    let model = Arc::new(RecordingModel::default());
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model))
        .unwrap()
        .with_max_sequence_length(4)
        .unwrap()
        .with_normalization(NormalizationConfig::disabled());

    assert_eq!(predictor.normalize("You're NICE :-)"), "You're NICE :-)");
    predictor.predict("You're NICE :-)").unwrap();
    // the vocabulary's own tokenizer still lowercases and filters
    assert_eq!(model.last_batch(), vec![vec![5, 0, 0, 0]]);
}

#[test]
fn empty_batch_is_an_error() {
    let model = Arc::new(RecordingModel::default());
    let predictor = Predictor::new(vocabulary(), Arc::clone(&model)).unwrap();
    let texts: Vec<String> = Vec::new();

    let err = predictor.predict_batch(&texts).unwrap_err();

    assert!(matches!(err, PredictError::EmptyInput));
    assert!(!err.is_configuration());
    assert_eq!(model.calls(), 0);
}

#[test]
fn blank_single_text_is_an_error() {
    let predictor = Predictor::new(vocabulary(), FixedScore(0.1)).unwrap();
    assert!(matches!(
        predictor.predict(" \n\t"),
        Err(PredictError::EmptyInput)
    ));
}

#[test]
fn model_failure_fails_whole_batch() {
    let predictor = Predictor::new(vocabulary(), FailingModel).unwrap();
    let err = predictor.predict_batch(&["you", "are"]).unwrap_err();
    assert!(matches!(
        err,
        PredictError::Inference(ModelError::Backend(_))
    ));
}

#[test]
fn wrong_score_count_is_an_inference_error() {
    let predictor = Predictor::new(vocabulary(), ShortOutput).unwrap();
    let err = predictor.predict_batch(&["you", "are"]).unwrap_err();
    assert!(matches!(
        err,
        PredictError::Inference(ModelError::OutputCount {
            expected: 2,
            actual: 1
        })
    ));
}

#[test]
fn predictor_is_shareable_across_threads() {
    let model = Arc::new(RecordingModel::with_toxic_ids(&[4]));
    let predictor = Arc::new(Predictor::new(vocabulary(), Arc::clone(&model)).unwrap());

    let handles = (0..4)
        .map(|i| {
            let predictor = Arc::clone(&predictor);
            std::thread::spawn(move || {
                let text = if i % 2 == 0 { "idiot" } else { "nice" };
                predictor.predict(text).unwrap().is_toxic
            })
        })
        .collect::<Vec<_>>();
    let toxic = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();

    assert_eq!(toxic, vec![true, false, true, false]);
    assert_eq!(model.calls(), 4);
}

#[test]
fn from_config_reports_missing_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let config = InferenceConfig {
        vocabulary_path: Some(dir.path().join("missing.json")),
        model_path: Some(dir.path().join("missing.onnx")),
        ..InferenceConfig::default()
    };
    let err = Predictor::from_config(&config)
        .err()
        .expect("missing artifacts must fail");
    assert!(matches!(err, PredictError::Vocabulary(_)));
    assert!(err.is_configuration());
}
