//! Shared builders for integration tests.

use std::sync::Arc;

use mailuo::analysis::AnalysisPipeline;
use mailuo::models::{Chapter, Novel};
use mailuo::text::Lexicons;
use mailuo::AnalysisConfig;

pub fn novel(id: &str, chapters: Vec<&str>) -> Novel {
    Novel {
        id: id.into(),
        title: format!("{id}-title"),
        author: Some("测试作者".into()),
        chapters: chapters
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chapter {
                index: i as u32 + 1,
                title: format!("第{}章", i + 1),
                text: text.to_string(),
            })
            .collect(),
    }
}

/// The planted five-chapter novel used by the end-to-end scenarios.
///
/// Characters: 刘备 (present in every chapter), 曹操, 关羽 (chapters 1 and
/// 5 only). Planted signals: a kin pattern and a friend pattern in chapter
/// 1, a positive chapter 2, a conflict with a turning cue in chapter 3, a
/// consequence + injury + strongly negative chapter 4, recovery in
/// chapter 5.
pub fn planted_novel(id: &str) -> Novel {
    novel(
        id,
        vec![
            // Chapter 1
            "刘备在洛阳出场。刘备的父亲是曹操。刘备与关羽是朋友。关羽见了刘备。曹操也在洛阳。",
            // Chapter 2
            "刘备很高兴。曹操大笑。刘备与曹操同行。",
            // Chapter 3
            "突然，刘备与曹操大战。刘备拔剑。曹操大怒。",
            // Chapter 4
            "于是刘备受伤。刘备很悲伤。众人痛苦流泪。曹操伤心离开了。",
            // Chapter 5
            "关羽归来见刘备。刘备痊愈了。众人在洛阳相聚。",
        ],
    )
}

pub fn pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(AnalysisConfig::default(), Arc::new(Lexicons::builtin()))
}
