//! Monotone counters for unique temporary, label, and loop-label names.
//!
//! The original compiler used `static int nextId` counters inside
//! `TackyGen::unique_var`/`unique_label`, which are process-wide and would
//! leak state across compilations run in the same process (e.g. two unit
//! tests). `NameGen` holds the same counters per-`TackyGen` invocation
//! instead, so two compilations never share state - the emitted program is
//! equivalent up to renaming either way.

pub struct NameGen {
    next_tmp: u32,
    next_label: u32,
}

impl NameGen {
    pub fn new() -> NameGen {
        NameGen {
            next_tmp: 0,
            next_label: 0,
        }
    }

    pub fn tmp(&mut self) -> String {
        let name = format!("tmp.{}", self.next_tmp);
        self.next_tmp += 1;
        name
    }

    pub fn label(&mut self, desc: &str) -> String {
        let name = format!("T{}.{}", desc, self.next_label);
        self.next_label += 1;
        name
    }
}

pub fn break_label(loop_id: u32) -> String {
    format!("break.{}", loop_id)
}

pub fn continue_label(loop_id: u32) -> String {
    format!("continue.{}", loop_id)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names_are_unique_and_ordered() {
        let mut names = NameGen::new();
        assert_eq!(names.tmp(), "tmp.0");
        assert_eq!(names.tmp(), "tmp.1");
        assert_eq!(names.label("if_end"), "Tif_end.0");
        assert_eq!(names.label("if_end"), "Tif_end.1");
    }

    #[test]
    fn loop_labels_format_as_break_continue() {
        assert_eq!(break_label(3), "break.3");
        assert_eq!(continue_label(3), "continue.3");
    }
}
