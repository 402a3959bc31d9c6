//! 端到端学习流程测试
//!
//! 通过公开 API 走完整个学习周期：装配核心 → 引入新词 →
//! 复习升盒 → 掌握 → 目标达成与连续天数。

use chrono::{Duration, Utc};
use slovo_core::{
    CoreError, Criteria, LearnCore, LearningState, NewWord, SchedulerConfig, WordOrigin,
};

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        base_interval_hours: 24,
        growth: 2.0,
        max_interval_hours: 24 * 30,
        max_box: 7,
        learned_threshold: 3,
    }
}

async fn core_with_words(pairs: &[(&str, &str)]) -> LearnCore {
    let core = LearnCore::init_in_memory(fast_config(), Utc::now())
        .await
        .expect("Failed to init core");

    for (en, ru) in pairs {
        core.words()
            .insert(NewWord {
                lemma_en: en.to_string(),
                lemma_ru: ru.to_string(),
                transcription: None,
                text_example: None,
                category_id: None,
                origin: WordOrigin::Preloaded,
            })
            .expect("Failed to seed word");
    }

    core
}

#[tokio::test]
async fn test_full_learning_cycle() {
    let core = core_with_words(&[("apple", "яблоко"), ("house", "дом"), ("milk", "молоко")]).await;
    let t0 = Utc::now();

    // 第一次装配：没有到期词，新词按目标容量全部引入
    let set = core.scheduler().load_daily_set(t0).await;
    assert!(set.store_error.is_none());
    assert!(set.to_review.is_empty());
    assert_eq!(set.to_learn.len(), 3);

    let word_id = set.to_learn[0].id;
    let started = core
        .scheduler()
        .start_learning(word_id, t0)
        .await
        .expect("Failed to start learning");
    assert_eq!(started.priority, 1);

    // 一天后到期
    let t1 = t0 + Duration::hours(25);
    let set = core.scheduler().load_daily_set(t1).await;
    assert_eq!(set.to_review.len(), 1);
    assert_eq!(set.to_review[0].id, word_id);

    // threshold = 3：恰好两次成功复习后掌握
    let outcome = core.scheduler().mark_reviewed(word_id, t1).await.unwrap();
    assert_eq!(outcome.word.learning_state, LearningState::Learning);
    assert_eq!(outcome.word.priority, 2);

    let t2 = t1 + Duration::hours(49);
    let outcome = core.scheduler().mark_reviewed(word_id, t2).await.unwrap();
    assert_eq!(outcome.word.learning_state, LearningState::Learned);
    assert!(outcome.word.learned_at.is_some());

    let overview = core.words().overview(t2).expect("Failed to build overview");
    assert_eq!(overview.learned_words, 1);
    assert_eq!(overview.new_words, 2);
}

#[tokio::test]
async fn test_failed_review_loops_in_session_without_double_penalty() {
    let core = core_with_words(&[("cat", "кот")]).await;
    let t0 = Utc::now();

    let word_id = core.words().find_new(1).unwrap()[0].id;
    core.scheduler().start_learning(word_id, t0).await.unwrap();

    let t1 = t0 + Duration::hours(25);
    let set = core.scheduler().load_daily_set(t1).await;
    assert_eq!(set.to_review.len(), 1);

    let word = core.scheduler().next_review().await.unwrap().unwrap();
    let failed = core
        .scheduler()
        .mark_not_reviewed(word.id, t1)
        .await
        .unwrap();

    // 盒号保持下限 1，排期只按降盒后的盒号重算一次
    assert_eq!(failed.priority, 1);
    let expected = t1 + fast_config().interval(1);
    assert_eq!(
        failed.next_review_at.map(|t| t.timestamp()),
        Some(expected.timestamp())
    );

    // 会话内立刻重现，复习成功后正常升盒
    let again = core.scheduler().next_review().await.unwrap().unwrap();
    assert_eq!(again.id, word.id);

    let outcome = core.scheduler().mark_reviewed(word.id, t1).await.unwrap();
    assert_eq!(outcome.word.priority, 2);
    assert_eq!(core.scheduler().session_remaining().await, 0);
}

#[tokio::test]
async fn test_goal_achievement_and_streak_across_days() {
    let core = core_with_words(&[("one", "один"), ("two", "два")]).await;
    let t0 = Utc::now();

    core.tracker()
        .set_daily_goal(2, t0)
        .await
        .expect("Failed to set goal");

    let words = core.words().find_new(2).unwrap();

    let first = core
        .scheduler()
        .mark_completely_learned(words[0].id, t0)
        .await
        .unwrap();
    assert!(!first.activity.goal_achieved_now);

    // 第二个词恰好达标，一次性信号只出现这一次
    let second = core
        .scheduler()
        .mark_completely_learned(words[1].id, t0)
        .await
        .unwrap();
    assert!(second.activity.goal_achieved_now);
    assert_eq!(second.activity.stats.learned_today, 2);

    // 次日首次活动：连续天数 +1，当日计数清零
    let t1 = t0 + Duration::days(1);
    let stats = core.tracker().refresh(t1).await.unwrap();
    assert_eq!(stats.streak_days, 1);
    assert_eq!(stats.learned_today, 0);
    assert!(!stats.goal_achieved_today);

    // 当天再刷新不会重复加
    let stats = core.tracker().refresh(t1).await.unwrap();
    assert_eq!(stats.streak_days, 1);
}

#[tokio::test]
async fn test_daily_set_respects_already_spent_goal() {
    let core = core_with_words(&[
        ("w1", "с1"),
        ("w2", "с2"),
        ("w3", "с3"),
        ("w4", "с4"),
    ])
    .await;
    let t0 = Utc::now();

    core.tracker().set_daily_goal(3, t0).await.unwrap();

    // 掌握两个词后，目标只剩 1 个名额
    let words = core.words().find_new(2).unwrap();
    for word in &words {
        core.scheduler()
            .mark_completely_learned(word.id, t0)
            .await
            .unwrap();
    }

    let set = core.scheduler().load_daily_set(t0).await;
    assert_eq!(set.to_learn.len(), 1);
}

#[tokio::test]
async fn test_practice_round_from_seeded_store() {
    let core = core_with_words(&[
        ("bread", "хлеб"),
        ("milk", "молоко"),
        ("salt", "соль"),
        ("water", "вода"),
    ])
    .await;

    let round = core
        .sampler()
        .sample(&Criteria::new(), 10, 4)
        .await
        .expect("Failed to sample");

    assert_eq!(round.choices.len(), 4);
    let correct_hits = round
        .choices
        .iter()
        .filter(|c| c.word_id == round.correct_id)
        .count();
    assert_eq!(correct_hits, 1);
}

#[tokio::test]
async fn test_invalid_transitions_surface_typed_errors() {
    let core = core_with_words(&[("apple", "яблоко")]).await;
    let now = Utc::now();
    let word_id = core.words().find_new(1).unwrap()[0].id;

    // 未开始学习就复习
    let result = core.scheduler().mark_reviewed(word_id, now).await;
    assert!(matches!(result, Err(CoreError::InvalidTransition(_))));

    // 掌握后再开始学习
    core.scheduler()
        .mark_completely_learned(word_id, now)
        .await
        .unwrap();
    let result = core.scheduler().start_learning(word_id, now).await;
    assert!(matches!(result, Err(CoreError::InvalidTransition(_))));
}

#[tokio::test]
async fn test_reset_wipes_progress_but_keeps_words() {
    let core = core_with_words(&[("one", "один"), ("two", "два")]).await;
    let now = Utc::now();

    let words = core.words().find_new(2).unwrap();
    core.scheduler()
        .start_learning(words[0].id, now)
        .await
        .unwrap();
    core.scheduler()
        .mark_completely_learned(words[1].id, now)
        .await
        .unwrap();

    let affected = core.scheduler().reset_learning_stats(now).await.unwrap();
    assert_eq!(affected, 2);

    let overview = core.words().overview(now).unwrap();
    assert_eq!(overview.total, 2);
    assert_eq!(overview.new_words, 2);
    assert_eq!(overview.learned_words, 0);
}
