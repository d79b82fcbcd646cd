//! Stepping a region backwards through its history, one invocation at a time.
//!
//! An [`UndoSession`] is owned by whatever hosts the document. The host
//! decides whether an invocation continues the previous one (a repeat) or
//! starts over; the session never tries to recognise a region it has walked
//! before, so any non-repeat invocation builds a completely new walk from the
//! current text.

use std::{
  collections::VecDeque,
  ops::Range,
  path::Path,
};

use ropey::Rope;

use crate::{
  error::{
    Error,
    Result,
  },
  history::{
    self,
    Origin,
    PatchUnit,
  },
  patch,
  range::{
    self,
    LineRange,
  },
  resolve,
  source::HistorySource,
};

/// What a single step did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub rank:      usize,
  pub origin:    Origin,
  /// Chars of the document now holding the older text.
  pub region:    Range<usize>,
  /// Units left in the walk after this one.
  pub remaining: usize,
}

impl Step {
  /// The lines covered by the replaced region, `None` once it became empty.
  pub fn region_lines(&self, doc: &Rope) -> Option<LineRange> {
    LineRange::from_char_range(doc, self.region.clone())
  }
}

/// The state of one walk: where the region currently sits in the document and
/// which units are still to be replayed.
#[derive(Debug, Clone)]
pub struct WalkState {
  region:    Range<usize>,
  remaining: VecDeque<PatchUnit>,
  exhausted: bool,
}

impl WalkState {
  /// Builds the full walk for `selection` (live line numbers) of `doc`.
  ///
  /// The first unit is the uncommitted change of the region, when there is
  /// one, followed by every commit that touched the region, newest first.
  pub fn plan<S>(doc: &Rope, file: &Path, selection: LineRange, source: &S) -> Result<Self>
  where
    S: HistorySource + ?Sized,
  {
    let region = selection.to_char_range(doc)?;
    let live = doc.slice(region.clone()).to_string();

    // enough context for every unchanged line to end up in a single hunk
    let context = range::content_lines(doc).max(1);
    let working_diff = source.working_diff(file, context)?;
    let head = resolve::resolve(selection, &working_diff)?;
    log::debug!("live lines {selection} are {head} in the last commit");

    let mut remaining = VecDeque::new();
    if let Some(committed) = resolve::head_text(head, &working_diff)?
      && committed != live
    {
      let hunks = patch::compare(&committed, &live);
      remaining.push_back(PatchUnit::new(0, Origin::Uncommitted, hunks));
    }

    let offset = remaining.len();
    for mut unit in history::build_history(source, file, head)? {
      unit.rank += offset;
      remaining.push_back(unit);
    }

    Ok(Self {
      region,
      exhausted: remaining.is_empty(),
      remaining,
    })
  }

  /// Chars of the document the walk will replace next.
  pub fn region(&self) -> Range<usize> {
    self.region.clone()
  }

  pub fn remaining(&self) -> usize {
    self.remaining.len()
  }

  /// Units not replayed yet, next one first.
  pub fn units(&self) -> impl Iterator<Item = &PatchUnit> {
    self.remaining.iter()
  }

  /// Whether every unit was replayed.
  pub fn is_exhausted(&self) -> bool {
    self.exhausted
  }

  /// Replaces the region with the older side of the next unit.
  ///
  /// The region is left untouched when there is nothing left to replay.
  pub fn step(&mut self, doc: &mut Rope) -> Result<Step> {
    let Some(unit) = self.remaining.pop_front() else {
      self.exhausted = true;
      return Err(Error::HistoryExhausted);
    };

    let text = patch::apply(&unit);
    let start = self.region.start;
    doc.remove(self.region.clone());
    doc.insert(start, &text);
    self.region = start..start + text.chars().count();
    self.exhausted = self.remaining.is_empty();

    log::info!(
      "replayed {} ({} left)",
      unit.origin,
      self.remaining.len()
    );
    Ok(Step {
      rank:      unit.rank,
      origin:    unit.origin,
      region:    self.region.clone(),
      remaining: self.remaining.len(),
    })
  }
}

#[derive(Debug, Clone, Default)]
pub enum Phase {
  #[default]
  Fresh,
  Walking(WalkState),
  Exhausted,
}

#[derive(Debug, Default)]
pub struct UndoSession {
  phase: Phase,
}

impl UndoSession {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn phase(&self) -> &Phase {
    &self.phase
  }

  /// Discards the current walk. Hosts call this for any action that is not a
  /// continuation of the walk.
  pub fn reset(&mut self) {
    self.phase = Phase::Fresh;
  }

  /// Starts a new walk over `selection` and takes its first step.
  ///
  /// Returns `Ok(None)` when the region has neither uncommitted changes nor
  /// committed history; the session is then exhausted. On error the session
  /// is left fresh and the document untouched.
  pub fn start<S>(
    &mut self,
    doc: &mut Rope,
    file: &Path,
    selection: LineRange,
    source: &S,
  ) -> Result<Option<Step>>
  where
    S: HistorySource + ?Sized,
  {
    self.reset();
    let mut walk = WalkState::plan(doc, file, selection, source)?;
    log::info!(
      "walking {} units for lines {selection} of {}",
      walk.remaining(),
      file.display()
    );

    if walk.is_exhausted() {
      self.phase = Phase::Exhausted;
      return Ok(None);
    }
    let step = walk.step(doc)?;
    self.phase = if walk.is_exhausted() {
      Phase::Exhausted
    } else {
      Phase::Walking(walk)
    };
    Ok(Some(step))
  }

  /// Takes the next step of the current walk.
  ///
  /// Fails with [`Error::HistoryExhausted`] once every unit was replayed, or
  /// when no walk is active.
  pub fn repeat(&mut self, doc: &mut Rope) -> Result<Step> {
    let Phase::Walking(walk) = &mut self.phase else {
      return Err(Error::HistoryExhausted);
    };
    let step = walk.step(doc);
    if walk.is_exhausted() {
      self.phase = Phase::Exhausted;
    }
    step
  }

  /// Entry point for hosts: continues the walk on a repeated invocation and
  /// starts a new one otherwise.
  pub fn invoke<S>(
    &mut self,
    doc: &mut Rope,
    file: &Path,
    selection: LineRange,
    source: &S,
    repeat: bool,
  ) -> Result<Option<Step>>
  where
    S: HistorySource + ?Sized,
  {
    match (&self.phase, repeat) {
      (Phase::Walking(_) | Phase::Exhausted, true) => self.repeat(doc).map(Some),
      _ => self.start(doc, file, selection, source),
    }
  }
}
