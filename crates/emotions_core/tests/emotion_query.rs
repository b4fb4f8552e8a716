use chrono::NaiveDate;
use emotions_core::{
    open_pool, DatabaseTarget, Emotion, EmotionFilter, EmotionRepository, PoolConfig, Quellenart,
    SqliteEmotionRepository,
};

fn memory_repo() -> SqliteEmotionRepository {
    let pool = open_pool(&DatabaseTarget::Memory, &PoolConfig::default()).unwrap();
    let repo = SqliteEmotionRepository::new(pool);
    repo.create_table().unwrap();
    repo
}

fn insert_with_age(repo: &SqliteEmotionRepository, context: &str, name: &str, alter: i64) {
    let mut emotion = Emotion::new(name);
    emotion.alter = Some(alter);
    repo.insert_emotion(context, &emotion).unwrap();
}

fn numbers(records: &[emotions_core::EmotionRecord]) -> Vec<i64> {
    records.iter().map(|record| record.nummer).collect()
}

#[test]
fn empty_filter_returns_whole_context_in_ascending_order() {
    let repo = memory_repo();
    for name in ["Wut", "Trauer", "Angst"] {
        repo.insert_emotion("u1", &Emotion::new(name)).unwrap();
    }
    repo.insert_emotion("u2", &Emotion::new("Freude")).unwrap();

    let own = repo.list_emotions("u1", &EmotionFilter::default()).unwrap();
    assert_eq!(numbers(&own), vec![1, 2, 3]);
    assert!(own.iter().all(|record| record.user_context == "u1"));

    let stranger = repo
        .list_emotions("nobody", &EmotionFilter::default())
        .unwrap();
    assert!(stranger.is_empty());
}

#[test]
fn age_range_is_inclusive() {
    let repo = memory_repo();
    for alter in [19, 20, 25, 30, 31] {
        insert_with_age(&repo, "u1", "Unruhe", alter);
    }

    let filter = EmotionFilter {
        alter_von: Some(20),
        alter_bis: Some(30),
        ..EmotionFilter::default()
    };
    let ages = repo
        .list_emotions("u1", &filter)
        .unwrap()
        .into_iter()
        .map(|record| record.alter.unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ages, vec![20, 25, 30]);
}

#[test]
fn date_range_is_inclusive_and_skips_undated_rows() {
    let repo = memory_repo();
    for day in [Some(1), Some(10), Some(20), None] {
        let mut emotion = Emotion::new("Sorge");
        emotion.datum = day.and_then(|d| NaiveDate::from_ymd_opt(2023, 5, d));
        repo.insert_emotion("u1", &emotion).unwrap();
    }

    let filter = EmotionFilter {
        datum_von: NaiveDate::from_ymd_opt(2023, 5, 10),
        datum_bis: NaiveDate::from_ymd_opt(2023, 5, 20),
        ..EmotionFilter::default()
    };
    assert_eq!(numbers(&repo.list_emotions("u1", &filter).unwrap()), vec![2, 3]);
}

#[test]
fn text_filters_match_case_insensitive_substrings() {
    let repo = memory_repo();
    let mut first = Emotion::new("Ärger über Chef");
    first.koerperteil = Some("Nacken".to_string());
    repo.insert_emotion("u1", &first).unwrap();

    let mut second = Emotion::new("Traurigkeit");
    second.bemerkungen = Some("100% sicher".to_string());
    repo.insert_emotion("u1", &second).unwrap();

    let by_emotion = EmotionFilter {
        emotion: Some("ÄRGER".to_string()),
        ..EmotionFilter::default()
    };
    assert_eq!(numbers(&repo.list_emotions("u1", &by_emotion).unwrap()), vec![1]);

    let by_body = EmotionFilter {
        koerperteil: Some("nack".to_string()),
        ..EmotionFilter::default()
    };
    assert_eq!(numbers(&repo.list_emotions("u1", &by_body).unwrap()), vec![1]);

    let literal_percent = EmotionFilter {
        bemerkungen: Some("0% s".to_string()),
        ..EmotionFilter::default()
    };
    assert_eq!(
        numbers(&repo.list_emotions("u1", &literal_percent).unwrap()),
        vec![2]
    );

    let wildcard_is_not_special = EmotionFilter {
        emotion: Some("%".to_string()),
        ..EmotionFilter::default()
    };
    assert!(repo
        .list_emotions("u1", &wildcard_is_not_special)
        .unwrap()
        .is_empty());
}

#[test]
fn exact_fields_and_combined_conditions() {
    let repo = memory_repo();
    let mut inherited = Emotion::new("Angst");
    inherited.quellenart = Some(Quellenart::Inherited);
    inherited.quelle = Some("Großvater".to_string());
    repo.insert_emotion("u1", &inherited).unwrap();

    let mut own = Emotion::new("Angst");
    own.quellenart = Some(Quellenart::Own);
    repo.insert_emotion("u1", &own).unwrap();

    let by_kind = EmotionFilter {
        quellenart: Some(Quellenart::Inherited),
        quelle: Some("großVATER".to_string()),
        ..EmotionFilter::default()
    };
    assert_eq!(numbers(&repo.list_emotions("u1", &by_kind).unwrap()), vec![1]);

    let by_number = EmotionFilter {
        nummer: Some(2),
        emotion: Some("angst".to_string()),
        ..EmotionFilter::default()
    };
    assert_eq!(numbers(&repo.list_emotions("u1", &by_number).unwrap()), vec![2]);

    let contradicting = EmotionFilter {
        nummer: Some(2),
        quellenart: Some(Quellenart::Inherited),
        ..EmotionFilter::default()
    };
    assert!(repo.list_emotions("u1", &contradicting).unwrap().is_empty());
}

#[test]
fn recent_returns_highest_numbers_first() {
    let repo = memory_repo();
    for _ in 0..5 {
        repo.insert_emotion("u1", &Emotion::new("Mut")).unwrap();
    }
    repo.insert_emotion("u2", &Emotion::new("Mut")).unwrap();

    assert_eq!(numbers(&repo.recent_emotions("u1", 2).unwrap()), vec![5, 4]);
    assert_eq!(
        numbers(&repo.recent_emotions("u1", 10).unwrap()),
        vec![5, 4, 3, 2, 1]
    );
    assert!(repo.recent_emotions("u1", 0).unwrap().is_empty());
}

#[test]
fn recent_reflects_deletions() {
    let repo = memory_repo();
    for _ in 0..3 {
        repo.insert_emotion("u1", &Emotion::new("Mut")).unwrap();
    }
    repo.delete_emotion("u1", 3).unwrap();

    assert_eq!(numbers(&repo.recent_emotions("u1", 2).unwrap()), vec![2, 1]);
}
