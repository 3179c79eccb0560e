use proptest::prelude::*;

use vigil_types::{Answer, AnswerRecord, Question, Timestamp};

proptest! {
    /// A choice answer is accepted iff its index addresses an option.
    #[test]
    fn choice_accepted_iff_in_range(n_options in 1usize..8, idx in 0usize..16) {
        let q = Question {
            id: "q".into(),
            text: "pick".into(),
            options: (0..n_options).map(|i| format!("opt{i}")).collect(),
        };
        prop_assert_eq!(q.accepts(&Answer::Choice(idx)), idx < n_options);
        prop_assert!(!q.accepts(&Answer::Text("typed".into())));
    }

    /// The last answer written for a question is the one that is read back.
    #[test]
    fn answer_record_last_write_wins(choices in prop::collection::vec(0usize..5, 1..20)) {
        let mut record = AnswerRecord::new();
        for c in &choices {
            record.set("q1", Answer::Choice(*c));
        }
        prop_assert_eq!(record.len(), 1);
        prop_assert_eq!(record.get("q1"), Some(&Answer::Choice(*choices.last().unwrap())));
    }

    /// Timestamp ordering follows the underlying millisecond count.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
        let ta = Timestamp::from_millis(a);
        let tb = Timestamp::from_millis(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta.as_secs(), a / 1000);
    }
}
