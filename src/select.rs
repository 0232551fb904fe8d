// 该文件是 Gungeon Recognizer 项目的一部分。
// src/select.rs - 前 K 个候选选择
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
  pub class_id: u32,
  pub score: f32,
}

/// 按分数降序排列的候选列表，同分时类别编号小者在前
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResult {
  pub items: Box<[Candidate]>,
}

impl RankedResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
    self.items.iter()
  }

  pub fn best(&self) -> Option<&Candidate> {
    self.items.first()
  }

  pub fn class_ids(&self) -> impl Iterator<Item = u32> + '_ {
    self.items.iter().map(|c| c.class_id)
  }
}

impl<'a> IntoIterator for &'a RankedResult {
  type Item = &'a Candidate;
  type IntoIter = std::slice::Iter<'a, Candidate>;

  fn into_iter(self) -> Self::IntoIter {
    self.items.iter()
  }
}

/// 有界插入选择，O(N·k)
///
/// 按类别编号递增扫描，只有严格更高的分数才会挤占已有槽位，
/// 因此同分时先出现（编号更小）的类别保留。NaN 排在所有实数分数之后。
pub fn select_top_k(scores: &[f32], k: usize) -> RankedResult {
  let capacity = k.min(scores.len());
  let mut slots: Vec<Option<Candidate>> = vec![None; capacity];

  for (class_id, &score) in scores.iter().enumerate() {
    let candidate = Candidate {
      class_id: class_id as u32,
      score,
    };

    let position = slots.iter().position(|slot| match slot {
      None => true,
      Some(occupant) => outranks(score, occupant.score),
    });

    if let Some(j) = position {
      if slots[j].is_some() {
        // 整体后移一位，丢弃末尾
        slots[j..].rotate_right(1);
      }
      slots[j] = Some(candidate);
    }
  }

  RankedResult {
    items: slots.into_iter().flatten().collect(),
  }
}

fn outranks(score: f32, occupant: f32) -> bool {
  match (score.is_nan(), occupant.is_nan()) {
    (true, _) => false,
    (false, true) => true,
    (false, false) => score > occupant,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ids(result: &RankedResult) -> Vec<u32> {
    result.class_ids().collect()
  }

  #[test]
  fn lower_class_id_wins_ties() {
    let result = select_top_k(&[5.0, 5.0, 3.0], 1);
    assert_eq!(
      result.items.as_ref(),
      &[Candidate {
        class_id: 0,
        score: 5.0
      }]
    );

    let result = select_top_k(&[1.0, 7.0, 7.0, 7.0, 2.0], 3);
    assert_eq!(ids(&result), vec![1, 2, 3]);
  }

  #[test]
  fn length_is_min_of_k_and_catalog_size() {
    let scores = [0.3, -1.0, 2.5, 0.0];
    assert_eq!(select_top_k(&scores, 0).len(), 0);
    assert_eq!(select_top_k(&scores, 2).len(), 2);
    assert_eq!(select_top_k(&scores, 4).len(), 4);
    assert_eq!(select_top_k(&scores, 10).len(), 4);
    assert!(select_top_k(&[], 5).is_empty());
  }

  #[test]
  fn result_is_sorted_and_dominates_the_rest() {
    let scores: Vec<f32> = (0..509)
      .map(|i| ((i * 7919) % 509) as f32 / 10.0 - 20.0)
      .collect();
    let result = select_top_k(&scores, 10);

    assert_eq!(result.len(), 10);
    assert!(result.items.windows(2).all(|w| w[0].score >= w[1].score));

    let floor = result.items.last().unwrap().score;
    for (id, score) in scores.iter().enumerate() {
      if !result.class_ids().any(|c| c as usize == id) {
        assert!(*score <= floor);
      }
    }
    for candidate in result.iter() {
      assert_eq!(scores[candidate.class_id as usize], candidate.score);
    }
  }

  #[test]
  fn matches_a_stable_sort() {
    let scores = [0.5f32, 0.9, 0.1, 0.9, 0.7, 0.5, 0.2, 0.9];
    let mut expected: Vec<u32> = (0..scores.len() as u32).collect();
    expected.sort_by(|a, b| scores[*b as usize].total_cmp(&scores[*a as usize]));

    for k in 0..=scores.len() {
      assert_eq!(ids(&select_top_k(&scores, k)), expected[..k].to_vec());
    }
  }

  #[test]
  fn best_is_first_slot() {
    let result = select_top_k(&[-3.0, -1.0, -2.0], 2);
    assert_eq!(result.best().map(|c| c.class_id), Some(1));
    assert_eq!(ids(&result), vec![1, 2]);
  }

  #[test]
  fn nan_scores_rank_last() {
    let result = select_top_k(&[f32::NAN, 1.0, 2.0], 2);
    assert_eq!(ids(&result), vec![2, 1]);

    let result = select_top_k(&[f32::NAN, 1.0, f32::NAN], 3);
    assert_eq!(ids(&result), vec![1, 0, 2]);
    assert!(result.items[1].score.is_nan());
  }
}
