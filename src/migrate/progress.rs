use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress over the migration plan. Position is the index of the archive
/// about to be imported, not the number already done.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(len: usize, enabled: bool) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(len as u64),
            if enabled {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        let style = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }

    pub fn start_archive(&self, index: usize, name: &str, command: &str) {
        self.bar.set_position(index as u64);
        self.bar
            .set_message(format!("importing archive {name} ({command})"));
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.set_position(self.bar.length().unwrap_or(0));
        self.bar.finish_with_message("done");
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
