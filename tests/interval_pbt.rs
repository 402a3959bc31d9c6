//! 间隔函数与查询引擎的性质测试

use proptest::prelude::*;
use slovo_core::storage::criteria;
use slovo_core::{Criteria, Cursor, SchedulerConfig, SortDirection};

fn config(base: i64, growth: f64, extra: i64) -> SchedulerConfig {
    SchedulerConfig {
        base_interval_hours: base,
        growth,
        max_interval_hours: base + extra,
        ..SchedulerConfig::default()
    }
}

proptest! {
    /// interval(p) 对 p 单调非减
    #[test]
    fn interval_is_non_decreasing(
        base in 1i64..=72,
        growth in 1.0f64..4.0,
        extra in 0i64..=2000,
        p in 1i32..40,
    ) {
        let config = config(base, growth, extra);
        prop_assert!(config.interval(p + 1) >= config.interval(p));
    }

    /// interval(p) 不超过配置上限
    #[test]
    fn interval_is_bounded_by_max(
        base in 1i64..=72,
        growth in 1.0f64..4.0,
        extra in 0i64..=2000,
        p in 1i32..60,
    ) {
        let config = config(base, growth, extra);
        prop_assert!(config.interval(p) <= chrono::Duration::hours(base + extra));
    }

    /// 第 1 盒总是等于基础间隔
    #[test]
    fn interval_starts_at_base(
        base in 1i64..=72,
        growth in 1.0f64..4.0,
        extra in 0i64..=2000,
    ) {
        let config = config(base, growth, extra);
        prop_assert_eq!(config.interval(1), chrono::Duration::hours(base));
    }

    /// 负数 limit 必定被拒绝
    #[test]
    fn negative_limit_is_always_rejected(limit in i64::MIN..0) {
        let cursor = Cursor { limit, ..Cursor::default() };
        prop_assert!(criteria::build(&Criteria::new(), &cursor).is_err());
    }

    /// 非负 limit 与任意游标组合总能构建
    #[test]
    fn non_negative_cursor_always_builds(
        limit in 0i64..=10_000,
        last_id in proptest::option::of(0i64..100_000),
        desc in any::<bool>(),
    ) {
        let cursor = Cursor {
            last_id,
            direction: if desc { SortDirection::Desc } else { SortDirection::Asc },
            limit,
        };
        prop_assert!(criteria::build(&Criteria::new(), &cursor).is_ok());
    }

    /// 任意搜索文本都不会让构建失败，且以单个绑定参数传递
    #[test]
    fn arbitrary_search_text_is_parameterized(text in ".{0,40}") {
        let built = criteria::build(
            &Criteria::new().with_search(text),
            &Cursor::default(),
        );
        let parts = built.expect("search text must never break the builder");
        prop_assert_eq!(parts.params.len(), 1);
    }
}
