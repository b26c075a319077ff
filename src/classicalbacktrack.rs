//! Classical backtracking execution engine

use crate::api::{ExtMatch, MatchOptions};
use crate::bytesearch;
use crate::charclasses::word_class;
use crate::cursor::Cursor;
use crate::error::MatchError;
use crate::insn::{CompiledRegex, Op, REGMAGIC};
use crate::matchers;
use crate::types::{
    Comparator, GroupData, LinePos, NodeId, Pos, PosArg, MAX_COMPLEX_BRACES, MAX_LIMIT, NSUBEXP,
};
use core::cmp::Ordering;
use log::{debug, trace};
use std::sync::atomic;

/// Result of running part of the program.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Status {
    /// Go on with the next node.
    Cont,
    /// An item was just pushed; let it make the first move.
    Break,
    Match,
    NoMatch,
}

/// A saved input position, with the number of BACK records at the time.
#[derive(Debug, Copy, Clone)]
struct RegSave {
    pos: Pos,
    backpos_len: usize,
}

/// Which capture slot a pushed MOPEN/MCLOSE/ZOPEN/ZCLOSE wrote.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Slot {
    Start,
    End,
    ZStart,
    ZEnd,
}

/// Capture groups saved around a lookbehind.
#[derive(Debug, Copy, Clone)]
struct SavedGroups {
    need_clear: bool,
    groups: [GroupData; NSUBEXP],
}

#[derive(Debug, Clone)]
struct BehindData {
    groups: SavedGroups,
    /// Where the text after the lookbehind ended.
    save_after: RegSave,
    /// The enclosing lookbehind's target.
    save_behind: Pos,
}

#[derive(Debug, Copy, Clone)]
struct StarData {
    /// The first character of a literal that must follow, if any.
    nextb: Option<char>,
    minval: u32,
    count: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Lookahead {
    Positive,
    Negative,
    Atomic,
}

#[derive(Debug, Clone)]
enum State {
    /// NOPEN and NCLOSE: the result is passed on.
    Passthrough,
    Capture {
        slot: Slot,
        no: usize,
        old: Option<Pos>,
    },
    Branch,
    /// `prev` is the loop count before this repetition.
    BraceMore {
        no: usize,
        prev: u32,
    },
    BraceLong {
        no: usize,
        prev: u32,
    },
    BraceShort,
    Lookahead(Lookahead),
    Behind {
        negative: bool,
        /// Set once what follows has matched and the operand is being
        /// tried at earlier and earlier positions.
        scanning: bool,
        limit: u32,
        data: Box<BehindData>,
    },
    Star {
        long: bool,
        data: StarData,
    },
}

#[derive(Debug, Clone)]
struct StackItem {
    state: State,
    scan: NodeId,
    save: RegSave,
}

/// A successful match. Positions are relative to the line the search
/// started on.
#[derive(Debug, Clone)]
pub(crate) struct RawMatch {
    pub groups: [GroupData; NSUBEXP],
    /// Column where the pattern started matching; differs from the start
    /// of group 0 when `\zs` was used.
    pub match_col: usize,
    /// Line the match ended on.
    pub last_lnum: isize,
    pub extmatch: Option<ExtMatch>,
}

#[derive(Debug)]
pub(crate) struct MatchAttempter<'r, 's, 'o> {
    re: &'r CompiledRegex,
    cur: Cursor<'s>,
    opts: &'o MatchOptions<'o>,
    icase: bool,
    stack: Vec<StackItem>,
    backpos: Vec<(NodeId, Pos)>,
    groups: [GroupData; NSUBEXP],
    zgroups: [GroupData; NSUBEXP],
    need_clear_groups: bool,
    need_clear_zgroups: bool,
    brace_min: [u32; MAX_COMPLEX_BRACES],
    brace_max: [u32; MAX_COMPLEX_BRACES],
    brace_count: [u32; MAX_COMPLEX_BRACES],
    bl_minval: u32,
    bl_maxval: u32,
    behind_pos: Pos,
    steps: u64,
}

#[inline]
fn brace_slot(no: u8) -> Result<usize, MatchError> {
    let no = no as usize;
    if no < MAX_COMPLEX_BRACES {
        Ok(no)
    } else {
        Err(MatchError::Corrupt)
    }
}

#[inline]
fn group_slot(no: u8) -> Result<usize, MatchError> {
    let no = no as usize;
    if no < NSUBEXP {
        Ok(no)
    } else {
        Err(MatchError::Corrupt)
    }
}

impl<'r, 's, 'o> MatchAttempter<'r, 's, 'o> {
    pub(crate) fn new(re: &'r CompiledRegex, cur: Cursor<'s>, opts: &'o MatchOptions<'o>) -> Self {
        let icase = if re.flags.icase {
            true
        } else if re.flags.noicase {
            false
        } else {
            opts.ignore_case
        };
        Self {
            re,
            cur,
            opts,
            icase,
            stack: Vec::new(),
            backpos: Vec::new(),
            groups: Default::default(),
            zgroups: Default::default(),
            need_clear_groups: true,
            need_clear_zgroups: false,
            brace_min: [0; MAX_COMPLEX_BRACES],
            brace_max: [0; MAX_COMPLEX_BRACES],
            brace_count: [0; MAX_COMPLEX_BRACES],
            bl_minval: 0,
            bl_maxval: 0,
            behind_pos: Pos::default(),
            steps: 0,
        }
    }

    #[inline]
    fn poll_interrupt(&self) -> Result<(), MatchError> {
        match self.opts.interrupt {
            Some(flag) if flag.load(atomic::Ordering::Relaxed) => Err(MatchError::Interrupted),
            _ => Ok(()),
        }
    }

    /// Count one dispatched node against the budget.
    #[inline]
    fn tick(&mut self) -> Result<(), MatchError> {
        self.steps += 1;
        if self.steps > self.opts.max_steps {
            debug!("match aborted after {} steps", self.opts.max_steps);
            return Err(MatchError::StackExhausted);
        }
        self.poll_interrupt()
    }

    fn push(&mut self, state: State, scan: NodeId) -> Result<(), MatchError> {
        if self.stack.len() >= self.opts.max_stack {
            debug!("match aborted with {} stack items", self.stack.len());
            return Err(MatchError::StackExhausted);
        }
        let save = self.reg_save();
        self.stack.push(StackItem { state, scan, save });
        Ok(())
    }

    #[inline]
    fn reg_save(&self) -> RegSave {
        RegSave {
            pos: self.cur.pos(),
            backpos_len: self.backpos.len(),
        }
    }

    #[inline]
    fn reg_restore(&mut self, save: RegSave) {
        self.cur.set_pos(save.pos);
        self.backpos.truncate(save.backpos_len);
    }

    /// Groups are cleared lazily, on first use in an attempt.
    fn cleanup_groups(&mut self) {
        if self.need_clear_groups {
            self.groups = Default::default();
            self.need_clear_groups = false;
        }
    }

    fn cleanup_zgroups(&mut self) {
        if self.need_clear_zgroups {
            self.zgroups = Default::default();
            self.need_clear_zgroups = false;
        }
    }

    fn slot_mut(&mut self, slot: Slot, no: usize) -> &mut Option<Pos> {
        match slot {
            Slot::Start => &mut self.groups[no].start,
            Slot::End => &mut self.groups[no].end,
            Slot::ZStart => &mut self.zgroups[no].start,
            Slot::ZEnd => &mut self.zgroups[no].end,
        }
    }

    /// Push the old value of a capture slot and set it to the current
    /// position.
    fn set_slot(&mut self, slot: Slot, no: usize, scan: NodeId) -> Result<(), MatchError> {
        let here = self.cur.pos();
        let old = *self.slot_mut(slot, no);
        self.push(State::Capture { slot, no, old }, scan)?;
        *self.slot_mut(slot, no) = Some(here);
        Ok(())
    }

    fn save_groups(&self) -> SavedGroups {
        SavedGroups {
            need_clear: self.need_clear_groups,
            groups: self.groups,
        }
    }

    fn restore_groups(&mut self, saved: &SavedGroups) {
        self.need_clear_groups = saved.need_clear;
        if !saved.need_clear {
            self.groups = saved.groups;
        }
    }

    /// The absolute position of the cursor.
    fn here(&self) -> LinePos {
        self.cur.absolute(self.cur.pos())
    }

    /// \return whether a single-character operand matches `c`.
    fn single_char_matches(&self, op: &Op, c: char) -> Result<bool, MatchError> {
        match op {
            Op::Class { class, .. } => Ok(class.matches(c)),
            Op::AnyOf { bracket, .. } => Ok(bracket.matches(c, self.icase)),
            Op::Exactly(s) => Ok(s
                .chars()
                .next()
                .map_or(false, |t| matchers::char_eq(c, t, self.icase))),
            _ => Err(MatchError::Corrupt),
        }
    }

    /// Match the single-character operand at `p` as often as possible, up
    /// to `maxcount` times. Leaves the cursor after the last match.
    fn regrepeat(&mut self, p: NodeId, maxcount: u32) -> Result<u32, MatchError> {
        let re = self.re;
        let op = re.op(p).ok_or(MatchError::Corrupt)?;
        let mut count = 0;
        if let Op::Newl = op {
            while count < maxcount {
                if self.cur.at_line_end() && self.cur.can_cross_line() {
                    self.cur.nextline();
                    self.poll_interrupt()?;
                } else if self.cur.line_lbr() && self.cur.peek() == Some('\n') {
                    self.cur.advance();
                } else {
                    break;
                }
                count += 1;
            }
            return Ok(count);
        }
        let nl = op.matches_newline();
        while count < maxcount {
            match self.cur.peek() {
                None => {
                    if !nl || !self.cur.can_cross_line() {
                        break;
                    }
                    self.cur.nextline();
                    self.poll_interrupt()?;
                }
                Some('\n') if nl && self.cur.line_lbr() => self.cur.advance(),
                Some(c) => {
                    if !self.single_char_matches(op, c)? {
                        break;
                    }
                    self.cur.advance();
                }
            }
            count += 1;
        }
        Ok(count)
    }

    /// Compare the text of a captured group with the input, advancing
    /// over it on success. The group may span lines.
    fn match_backref(&mut self, start: Pos, end: Pos) -> bool {
        if end < start {
            return true;
        }
        if start.lnum == self.cur.lnum && end.lnum == self.cur.lnum {
            let text = self.cur.line.get(start.col..end.col).unwrap_or("");
            return match matchers::cstrncmp(text, self.cur.rest(), self.icase) {
                Some(len) => {
                    self.cur.col += len;
                    true
                }
                None => false,
            };
        }
        let mut clnum = start.lnum;
        let mut ccol = start.col;
        loop {
            let line = match self.cur.getline(clnum) {
                Some(line) => line,
                None => return false,
            };
            let seg = if clnum == end.lnum {
                line.get(ccol..end.col)
            } else {
                line.get(ccol..)
            }
            .unwrap_or("");
            let rest = self.cur.rest();
            let len = match matchers::cstrncmp(seg, rest, self.icase) {
                Some(len) => len,
                None => return false,
            };
            if clnum == end.lnum {
                self.cur.col += len;
                return true;
            }
            // The captured line ended; so must this one.
            if len != rest.len() || self.cur.lnum >= self.cur.maxline() {
                return false;
            }
            self.cur.nextline();
            clnum += 1;
            ccol = 0;
        }
    }

    /// Resolve the number of a `\%l`, `\%c` or `\%v` item.
    fn pos_arg(&self, arg: PosArg, kind: char) -> Option<u64> {
        match arg {
            PosArg::Number(n) => Some(n),
            PosArg::Cursor => {
                let cursor = self.cur.source().cursor()?;
                let n = match kind {
                    'l' => cursor.lnum,
                    'c' => cursor.col,
                    _ => {
                        let line = self.cur.source().line(cursor.lnum)?;
                        self.cur.source().virtual_col(line, cursor.col)
                    }
                };
                Some(n as u64 + 1)
            }
        }
    }

    fn compare_pos(&self, cmp: Comparator, val: usize, arg: PosArg, kind: char) -> bool {
        match self.pos_arg(arg, kind) {
            Some(n) => cmp.test(val as u64 + 1, n),
            None => false,
        }
    }

    fn at_mark(&self, cmp: Comparator, name: char) -> bool {
        let mark = match self.cur.source().mark(name) {
            Some(mark) => mark,
            None => return false,
        };
        let here = self.here();
        let mark = if mark.lnum == here.lnum {
            LinePos::new(mark.lnum, mark.col.min(self.cur.line.len()))
        } else {
            mark
        };
        match mark.cmp(&here) {
            Ordering::Equal => cmp == Comparator::Equal,
            Ordering::Less => cmp == Comparator::Greater,
            Ordering::Greater => cmp == Comparator::Less,
        }
    }

    /// Execute the node at `scan`. May change `next` or push an item.
    fn dispatch(
        &mut self,
        scan: NodeId,
        op: &'r Op,
        next: &mut Option<NodeId>,
    ) -> Result<Status, MatchError> {
        let re = self.re;
        let c = self.cur.peek();
        let ok = match op {
            Op::End => return Ok(Status::Match),
            Op::Bol => self.cur.at_line_start(),
            Op::Eol => c.is_none(),
            Op::Bof => {
                self.cur.lnum == 0
                    && self.cur.at_line_start()
                    && !(self.cur.is_multi() && self.cur.first_line() > 0)
            }
            Op::Eof => self.cur.lnum == self.cur.maxline() && c.is_none(),
            Op::Cursor => self.cur.source().cursor() == Some(self.here()),
            Op::Visual => self.cur.source().in_visual(self.here()),
            Op::Lnum { cmp, arg } => {
                self.cur.is_multi() && self.compare_pos(*cmp, self.here().lnum, *arg, 'l')
            }
            Op::Col { cmp, arg } => self.compare_pos(*cmp, self.cur.col, *arg, 'c'),
            Op::VCol { cmp, arg } => {
                let vcol = self.cur.virtual_col();
                self.compare_pos(*cmp, vcol, *arg, 'v')
            }
            Op::Mark { cmp, name } => self.at_mark(*cmp, *name),
            Op::Bow => match c {
                None => false,
                Some(_) => {
                    let this_class = word_class(c);
                    let prev_class = self.cur.peek_back().map(|p| word_class(Some(p)));
                    this_class > 1 && prev_class != Some(this_class)
                }
            },
            Op::Eow => {
                if self.cur.at_line_start() {
                    false
                } else {
                    let this_class = word_class(c);
                    let prev_class = word_class(self.cur.peek_back());
                    !(this_class == prev_class || prev_class == 0 || prev_class == 1)
                }
            }
            Op::Class { class, .. } => match c {
                Some(c) if class.matches(c) => {
                    self.cur.advance();
                    true
                }
                _ => false,
            },
            Op::AnyOf { bracket, .. } => match c {
                Some(c) if bracket.matches(c, self.icase) => {
                    self.cur.advance();
                    true
                }
                _ => false,
            },
            Op::Exactly(s) => match matchers::cstrncmp(s, self.cur.rest(), self.icase) {
                Some(len) => {
                    self.cur.col += len;
                    true
                }
                None => false,
            },
            Op::Nothing => true,
            Op::Back => {
                let here = self.cur.pos();
                match self.backpos.iter().position(|&(at, _)| at == scan) {
                    None => {
                        self.backpos.push((scan, here));
                        true
                    }
                    Some(i) if self.backpos[i].1 == here => false,
                    Some(i) => {
                        self.backpos[i].1 = here;
                        true
                    }
                }
            }
            Op::MOpen(no) => {
                self.cleanup_groups();
                self.set_slot(Slot::Start, group_slot(*no)?, scan)?;
                true
            }
            Op::MClose(no) => {
                self.cleanup_groups();
                self.set_slot(Slot::End, group_slot(*no)?, scan)?;
                true
            }
            Op::ZOpen(no) => {
                self.cleanup_zgroups();
                self.set_slot(Slot::ZStart, group_slot(*no)?, scan)?;
                true
            }
            Op::ZClose(no) => {
                self.cleanup_zgroups();
                self.set_slot(Slot::ZEnd, group_slot(*no)?, scan)?;
                true
            }
            Op::NOpen | Op::NClose => {
                self.push(State::Passthrough, scan)?;
                true
            }
            Op::BackRef(no) => {
                self.cleanup_groups();
                let group = self.groups[group_slot(*no)?];
                match (group.start, group.end) {
                    (Some(start), Some(end)) => self.match_backref(start, end),
                    // An unset group matches the empty string.
                    _ => true,
                }
            }
            Op::ZRef(no) => {
                self.cleanup_zgroups();
                let no = group_slot(*no)?;
                match self.opts.extmatch.and_then(|e| e.matches[no].as_deref()) {
                    Some(text) => match matchers::cstrncmp(text, self.cur.rest(), self.icase) {
                        Some(len) => {
                            self.cur.col += len;
                            true
                        }
                        None => false,
                    },
                    None => true,
                }
            }
            Op::Branch => {
                let after = next.ok_or(MatchError::Corrupt)?;
                if let Some(Op::Branch) = re.op(after) {
                    self.push(State::Branch, scan)?;
                    return Ok(Status::Break);
                }
                // No choice.
                *next = Some(CompiledRegex::operand(scan));
                true
            }
            Op::BraceLimits { min, max } => {
                match next.and_then(|n| re.op(n)) {
                    Some(Op::BraceSimple) => {
                        self.bl_minval = *min;
                        self.bl_maxval = *max;
                    }
                    Some(Op::BraceComplex(no)) => {
                        let no = brace_slot(*no)?;
                        self.brace_min[no] = *min;
                        self.brace_max[no] = *max;
                        self.brace_count[no] = 0;
                    }
                    _ => return Err(MatchError::Corrupt),
                }
                true
            }
            Op::BraceComplex(no) => {
                let no = brace_slot(*no)?;
                let prev = self.brace_count[no];
                self.brace_count[no] = prev.saturating_add(1);
                let (min, max, count) = (self.brace_min[no], self.brace_max[no], self.brace_count[no]);
                if count <= min.min(max) {
                    // Not enough yet: one more.
                    self.push(State::BraceMore { no, prev }, scan)?;
                    *next = Some(CompiledRegex::operand(scan));
                } else if min <= max {
                    if count <= max {
                        self.push(State::BraceLong { no, prev }, scan)?;
                        *next = Some(CompiledRegex::operand(scan));
                    }
                } else if count <= min {
                    // Lazy: first try what follows.
                    self.push(State::BraceShort, scan)?;
                }
                true
            }
            Op::Star | Op::Plus | Op::BraceSimple => {
                let nextb = match next.and_then(|n| re.op(n)) {
                    Some(Op::Exactly(s)) => s.chars().next(),
                    _ => None,
                };
                let (minval, maxval) = match op {
                    Op::Star => (0, MAX_LIMIT),
                    Op::Plus => (1, MAX_LIMIT),
                    _ => (self.bl_minval, self.bl_maxval),
                };
                let count = self.regrepeat(CompiledRegex::operand(scan), maxval)?;
                let could_match = if minval <= maxval {
                    count >= minval
                } else {
                    count >= maxval
                };
                if !could_match {
                    return Ok(Status::NoMatch);
                }
                let data = StarData {
                    nextb,
                    minval,
                    count,
                };
                self.push(
                    State::Star {
                        long: minval <= maxval,
                        data,
                    },
                    scan,
                )?;
                return Ok(Status::Break);
            }
            Op::Match | Op::NoMatch | Op::SubPat => {
                let kind = match op {
                    Op::Match => Lookahead::Positive,
                    Op::NoMatch => Lookahead::Negative,
                    _ => Lookahead::Atomic,
                };
                self.push(State::Lookahead(kind), scan)?;
                *next = Some(CompiledRegex::operand(scan));
                true
            }
            Op::Behind { limit } | Op::NoBehind { limit } => {
                // What follows is tried first; the operand is checked when
                // that matched.
                let data = Box::new(BehindData {
                    groups: self.save_groups(),
                    save_after: self.reg_save(),
                    save_behind: self.behind_pos,
                });
                let state = State::Behind {
                    negative: matches!(op, Op::NoBehind { .. }),
                    scanning: false,
                    limit: *limit,
                    data,
                };
                self.push(state, scan)?;
                true
            }
            Op::BhPos => self.cur.pos() == self.behind_pos,
            // A line break that could not be taken.
            Op::Newl => false,
        };
        Ok(if ok { Status::Cont } else { Status::NoMatch })
    }

    /// Move a lookbehind attempt one character further back.
    /// \return false when it cannot go back any more.
    fn behind_step(&mut self, save: &mut RegSave, limit: u32) -> bool {
        let limit = limit as usize;
        let behind = self.behind_pos;
        if self.cur.is_multi() {
            let line_len = self.cur.getline(save.pos.lnum).map_or(0, str::len);
            let span = if save.pos.lnum < behind.lnum {
                line_len
            } else {
                behind.col
            };
            if limit > 0 && span.saturating_sub(save.pos.col) >= limit {
                return false;
            }
            if save.pos.col == 0 {
                // Go to the previous line, only once.
                if save.pos.lnum < behind.lnum {
                    return false;
                }
                match self.cur.getline(save.pos.lnum - 1) {
                    Some(line) => save.pos = Pos::new(save.pos.lnum - 1, line.len()),
                    None => return false,
                }
            } else {
                let line = self.cur.getline(save.pos.lnum).unwrap_or("");
                let back = line
                    .get(..save.pos.col)
                    .and_then(|s| s.chars().next_back())
                    .map_or(1, char::len_utf8);
                save.pos.col -= back;
            }
        } else {
            if save.pos.col == 0 {
                return false;
            }
            let back = self
                .cur
                .line
                .get(..save.pos.col)
                .and_then(|s| s.chars().next_back())
                .map_or(1, char::len_utf8);
            save.pos.col -= back;
            if limit > 0 && behind.col - save.pos.col > limit {
                return false;
            }
        }
        true
    }

    /// Handle the item on top of the stack after `status` came back.
    /// \return whether the item stays on the stack.
    fn unwind(
        &mut self,
        item: &mut StackItem,
        status: &mut Status,
        scan: &mut NodeId,
    ) -> Result<bool, MatchError> {
        let re = self.re;
        let StackItem {
            state,
            scan: item_scan,
            save,
        } = item;
        match state {
            State::Passthrough => {}
            State::Capture { slot, no, old } => {
                if *status == Status::NoMatch {
                    *self.slot_mut(*slot, *no) = *old;
                }
            }
            State::Branch => {
                if *status != Status::Match {
                    if *status != Status::Break {
                        // That alternative failed: on to the next one.
                        self.reg_restore(*save);
                        *scan = *item_scan;
                    }
                    if let Some(Op::Branch) = re.op(*scan) {
                        *item_scan = re.regnext(*scan).ok_or(MatchError::Corrupt)?;
                        *save = self.reg_save();
                        *scan = CompiledRegex::operand(*scan);
                        return Ok(true);
                    }
                    *status = Status::NoMatch;
                }
            }
            State::BraceMore { no, prev } => {
                if *status == Status::NoMatch {
                    self.reg_restore(*save);
                    self.brace_count[*no] = *prev;
                }
            }
            State::BraceLong { no, prev } => {
                if *status == Status::NoMatch {
                    // Enough matches: go on after the loop.
                    self.reg_restore(*save);
                    self.brace_count[*no] = *prev;
                    *status = Status::Cont;
                    *scan = re.regnext(*item_scan).ok_or(MatchError::Corrupt)?;
                    return Ok(false);
                }
            }
            State::BraceShort => {
                if *status == Status::NoMatch {
                    // Try one more repetition.
                    self.reg_restore(*save);
                    *status = Status::Cont;
                    *scan = CompiledRegex::operand(*item_scan);
                    return Ok(false);
                }
            }
            State::Lookahead(kind) => {
                let failed = match kind {
                    Lookahead::Negative => *status == Status::Match,
                    _ => *status == Status::NoMatch,
                };
                if failed {
                    *status = Status::NoMatch;
                } else {
                    if *kind != Lookahead::Atomic {
                        self.reg_restore(*save);
                    }
                    *status = Status::Cont;
                    *scan = re.regnext(*item_scan).ok_or(MatchError::Corrupt)?;
                    return Ok(false);
                }
            }
            State::Behind {
                negative,
                scanning,
                limit,
                data,
            } => {
                if !*scanning {
                    if *status == Status::NoMatch {
                        *scan = *item_scan;
                        return Ok(false);
                    }
                    // What follows matched. Now look for the operand ending
                    // where it started, beginning at that very position.
                    data.save_after = self.reg_save();
                    data.save_behind = self.behind_pos;
                    self.behind_pos = save.pos;
                    *scanning = true;
                    self.reg_restore(*save);
                    *scan = CompiledRegex::operand(*item_scan);
                    return Ok(true);
                }
                if *status == Status::Match && self.cur.pos() == self.behind_pos {
                    self.behind_pos = data.save_behind;
                    if *negative {
                        *status = Status::NoMatch;
                        self.restore_groups(&data.groups);
                    } else {
                        self.reg_restore(data.save_after);
                    }
                } else if self.behind_step(save, *limit) {
                    self.reg_restore(*save);
                    *scan = CompiledRegex::operand(*item_scan);
                    if *status == Status::Match {
                        *status = Status::NoMatch;
                        self.restore_groups(&data.groups);
                    }
                    return Ok(true);
                } else {
                    self.behind_pos = data.save_behind;
                    if *negative {
                        self.reg_restore(data.save_after);
                        *status = Status::Match;
                    } else if *status == Status::Match {
                        *status = Status::NoMatch;
                        self.restore_groups(&data.groups);
                    }
                }
            }
            State::Star { long, data } => {
                if *status != Status::Match {
                    if *status != Status::Break {
                        self.reg_restore(*save);
                    }
                    loop {
                        if *status != Status::Break {
                            if *long {
                                // Back up one character or line break.
                                if data.count <= data.minval {
                                    break;
                                }
                                data.count -= 1;
                                if self.cur.at_line_start() {
                                    if self.cur.lnum == 0 {
                                        *status = Status::NoMatch;
                                        break;
                                    }
                                    let prev = self.cur.lnum - 1;
                                    match self.cur.getline(prev) {
                                        Some(line) => self.cur.set_pos(Pos::new(prev, line.len())),
                                        None => break,
                                    }
                                } else {
                                    self.cur.back();
                                }
                            } else {
                                // Lazy: minval and maxval are swapped.
                                if data.count == data.minval
                                    || self.regrepeat(CompiledRegex::operand(*item_scan), 1)? == 0
                                {
                                    break;
                                }
                                data.count += 1;
                            }
                        } else {
                            *status = Status::NoMatch;
                        }
                        let could_match = match data.nextb {
                            None => true,
                            Some(b) => self
                                .cur
                                .peek()
                                .map_or(false, |c| matchers::char_eq(c, b, self.icase)),
                        };
                        if could_match {
                            *save = self.reg_save();
                            *scan = re.regnext(*item_scan).ok_or(MatchError::Corrupt)?;
                            *status = Status::Cont;
                            return Ok(true);
                        }
                    }
                    *status = Status::NoMatch;
                }
            }
        }
        *scan = *item_scan;
        Ok(false)
    }

    /// Run the program from `start`. \return whether it matched; the
    /// cursor is then at the end of the match.
    fn regmatch(&mut self, start: NodeId) -> Result<bool, MatchError> {
        let re = self.re;
        self.stack.clear();
        self.backpos.clear();
        let mut scan = start;
        loop {
            let mut status = loop {
                self.tick()?;
                let node = re.nodes.get(scan).ok_or(MatchError::Corrupt)?;
                let mut next = node.next;
                let status = if node.op.matches_newline()
                    && self.cur.at_line_end()
                    && self.cur.can_cross_line()
                {
                    self.cur.nextline();
                    Status::Cont
                } else if node.op.matches_newline()
                    && self.cur.line_lbr()
                    && self.cur.peek() == Some('\n')
                {
                    self.cur.advance();
                    Status::Cont
                } else {
                    self.dispatch(scan, &node.op, &mut next)?
                };
                if status != Status::Cont {
                    break status;
                }
                scan = next.ok_or(MatchError::Corrupt)?;
            };

            while let Some(mut item) = self.stack.pop() {
                let keep = self.unwind(&mut item, &mut status, &mut scan)?;
                if keep {
                    self.stack.push(item);
                    break;
                }
                if status == Status::Cont {
                    break;
                }
            }

            if status != Status::Cont && self.stack.is_empty() {
                return Ok(status == Status::Match);
            }
        }
    }

    /// Try a match starting at byte `col` of the first line.
    fn regtry(&mut self, col: usize) -> Result<bool, MatchError> {
        self.cur.set_pos(Pos::new(0, col));
        self.need_clear_groups = true;
        self.need_clear_zgroups = self.re.flags.z_set;
        trace!("trying at column {}", col);
        if !self.regmatch(0)? {
            return Ok(false);
        }
        self.cleanup_groups();
        if self.groups[0].start.is_none() {
            self.groups[0].start = Some(Pos::new(0, col));
        }
        match self.groups[0].end {
            None => self.groups[0].end = Some(self.cur.pos()),
            // `\ze` decides the line the match ends on.
            Some(end) => self.cur.lnum = end.lnum,
        }
        Ok(true)
    }

    /// Package the `\z(` groups of a successful match.
    fn take_extmatch(&mut self) -> Option<ExtMatch> {
        if !self.re.flags.z_set {
            return None;
        }
        self.cleanup_zgroups();
        let mut ext = ExtMatch::default();
        for (slot, group) in ext.matches.iter_mut().zip(self.zgroups.iter()) {
            if let (Some(start), Some(end)) = (group.start, group.end) {
                // Only single-line groups are exported.
                if start.lnum == end.lnum && end.col >= start.col {
                    *slot = self
                        .cur
                        .getline(start.lnum)
                        .and_then(|line| line.get(start.col..end.col))
                        .map(String::from);
                }
            }
        }
        Some(ext)
    }
}

#[derive(Debug)]
pub struct BacktrackExecutor<'r, 's, 'o> {
    matcher: MatchAttempter<'r, 's, 'o>,
}

impl<'r, 's, 'o> BacktrackExecutor<'r, 's, 'o> {
    pub(crate) fn new(re: &'r CompiledRegex, cur: Cursor<'s>, opts: &'o MatchOptions<'o>) -> Self {
        Self {
            matcher: MatchAttempter::new(re, cur, opts),
        }
    }

    /// Search the first line from byte `col` for the first position where
    /// a match starts.
    pub(crate) fn search(&mut self, mut col: usize) -> Result<Option<RawMatch>, MatchError> {
        let re = self.matcher.re;
        if re.magic != REGMAGIC {
            return Err(MatchError::Corrupt);
        }
        let max_col = self.matcher.opts.max_col;
        if max_col > 0 && col >= max_col {
            return Ok(None);
        }
        let icase = self.matcher.icase;
        let line = self.matcher.cur.getline(0).unwrap_or("");
        if col > line.len() || !line.is_char_boundary(col) {
            return Ok(None);
        }
        if !bytesearch::contains_must(re, line, col, icase) {
            trace!("required literal not present");
            return Ok(None);
        }

        let found = if re.anchored {
            // Only one place to try.
            let start_ok = match re.regstart {
                None => true,
                Some(s) => line[col..]
                    .chars()
                    .next()
                    .map_or(false, |c| matchers::char_eq(c, s, icase)),
            };
            start_ok && self.matcher.regtry(col)?
        } else {
            loop {
                if let Some(s) = re.regstart {
                    match bytesearch::find_start_char(line, col, s, icase) {
                        Some(found) => col = found,
                        None => break false,
                    }
                }
                if max_col > 0 && col >= max_col {
                    break false;
                }
                if self.matcher.regtry(col)? {
                    break true;
                }
                match line[col..].chars().next() {
                    Some(c) => col += c.len_utf8(),
                    None => break false,
                }
            }
        };
        if !found {
            return Ok(None);
        }

        let m = &mut self.matcher;
        let mut groups = m.groups;
        // The end is never before the start, which \zs and \ze can cause.
        if let (Some(start), Some(end)) = (groups[0].start, groups[0].end) {
            if end < start {
                groups[0].end = Some(start);
            }
        }
        let extmatch = m.take_extmatch();
        Ok(Some(RawMatch {
            groups,
            match_col: col,
            last_lnum: m.cur.lnum,
            extmatch,
        }))
    }
}
