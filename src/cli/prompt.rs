//! Interactive prompts for the plot command.
//!
//! This is intentionally kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the prompts provide the "run `phicp plot -i` and pick from lists" UX
//!
//! Prompts only collect answers into `PlotAnswers`; interpreting them is done
//! by `app::answers`.

use std::io::{self, BufRead, Write};

use crate::app::answers::PlotAnswers;
use crate::data::{Sample, SampleCatalog};
use crate::error::AppError;

/// Line-oriented prompt over any reader/writer pair.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.output, "{text}")
            .map_err(|e| AppError::config(format!("Failed to write prompt: {e}")))
    }

    /// Print `question` and read one trimmed line. `q` cancels.
    fn ask(&mut self, question: &str) -> Result<String, AppError> {
        write!(self.output, "{question}")
            .and_then(|_| self.output.flush())
            .map_err(|e| AppError::config(format!("Failed to write prompt: {e}")))?;

        let mut line = String::new();
        let bytes = self
            .input
            .read_line(&mut line)
            .map_err(|e| AppError::config(format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::config(
                "No input received. Pass --samples/--branches instead of --interactive.",
            ));
        }
        let line = line.trim().to_string();
        if line.eq_ignore_ascii_case("q") {
            return Err(AppError::config("Canceled."));
        }
        Ok(line)
    }

    /// Pick one option by number.
    pub fn choose_one(&mut self, title: &str, options: &[&str]) -> Result<usize, AppError> {
        self.list(title, options)?;
        loop {
            let input = self.ask(&format!("Select one (1-{}, q to quit): ", options.len()))?;
            match input.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => self.say(&format!(
                    "Invalid choice: '{input}'. Enter a number between 1 and {}.",
                    options.len()
                ))?,
            }
        }
    }

    /// Pick one or more options: `1,3`, `2-4`, `all`.
    pub fn choose_many(&mut self, title: &str, options: &[&str]) -> Result<Vec<usize>, AppError> {
        self.list(title, options)?;
        loop {
            let input = self.ask(&format!(
                "Select (e.g. 1,3 or 2-4 or all; 1-{}, q to quit): ",
                options.len()
            ))?;
            match parse_selection(&input, options.len()) {
                Ok(picked) => return Ok(picked),
                Err(msg) => self.say(&msg)?,
            }
        }
    }

    /// Free text with a default used for an empty answer.
    pub fn text(&mut self, question: &str, default: &str) -> Result<String, AppError> {
        let input = self.ask(&format!("{question} [{default}]: "))?;
        Ok(if input.is_empty() { default.to_string() } else { input })
    }

    fn list(&mut self, title: &str, options: &[&str]) -> Result<(), AppError> {
        if options.is_empty() {
            return Err(AppError::no_data(format!("{title}: nothing to choose from.")));
        }
        self.say(title)?;
        for (idx, opt) in options.iter().enumerate() {
            self.say(&format!("{:>3}) {opt}", idx + 1))?;
        }
        Ok(())
    }
}

/// Parse a selection like `1,3`, `2-4` or `all` into zero-based indices.
///
/// Order of first mention is kept; duplicates are dropped.
pub fn parse_selection(input: &str, n: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return Ok((0..n).collect());
    }
    let mut out = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()).filter(|s| !s.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>(), b.trim().parse::<usize>()),
            None => (part.parse::<usize>(), part.parse::<usize>()),
        };
        let (Ok(lo), Ok(hi)) = (lo, hi) else {
            return Err(format!("Invalid selection: '{part}'."));
        };
        if lo == 0 || hi > n || lo > hi {
            return Err(format!("Selection '{part}' is outside 1-{n}."));
        }
        for i in lo - 1..hi {
            if !out.contains(&i) {
                out.push(i);
            }
        }
    }
    if out.is_empty() {
        return Err("Select at least one entry.".to_string());
    }
    Ok(out)
}

const MODE_1D: &str = "1-D histograms + cosine fit";
const MODE_2D: &str = "2-D histogram (heat map)";

/// Ask for mode, samples, branches, cuts and output name.
///
/// `branches_of` lists the branches available in a sample; it is called for
/// the first selected sample.
pub fn ask_plot_answers<R, W, F>(
    prompter: &mut Prompter<R, W>,
    catalog: &SampleCatalog,
    branches_of: F,
) -> Result<PlotAnswers, AppError>
where
    R: BufRead,
    W: Write,
    F: Fn(&Sample) -> Result<Vec<String>, AppError>,
{
    let two_d = prompter.choose_one("Plot mode:", &[MODE_1D, MODE_2D])? == 1;

    let labels = catalog.labels();
    let picked = prompter.choose_many("Samples:", &labels)?;
    let samples: Vec<String> = picked.iter().map(|&i| labels[i].to_string()).collect();

    let first = catalog.get(&samples[0])?;
    let available = branches_of(first)?;
    let options: Vec<&str> = available.iter().map(String::as_str).collect();

    let (branches, y_branch) = if two_d {
        let x = prompter.choose_one("X branch:", &options)?;
        let y = prompter.choose_one("Y branch:", &options)?;
        (vec![available[x].clone()], Some(available[y].clone()))
    } else {
        let picked = prompter.choose_many("Branches:", &options)?;
        (picked.iter().map(|&i| available[i].clone()).collect(), None)
    };

    let cuts = prompter.text("Cuts (name:lo:hi, separated by spaces)", "")?;
    let output = prompter.text("Output name", "result")?;

    Ok(PlotAnswers {
        samples,
        branches,
        y_branch,
        cuts,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_ranges_and_lists() {
        assert_eq!(parse_selection("1,3", 4).unwrap(), vec![0, 2]);
        assert_eq!(parse_selection("2-4", 4).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_selection("3 1 3", 4).unwrap(), vec![2, 0]);
        assert_eq!(parse_selection("all", 3).unwrap(), vec![0, 1, 2]);
        assert!(parse_selection("0", 3).is_err());
        assert!(parse_selection("5", 3).is_err());
        assert!(parse_selection("x", 3).is_err());
        assert!(parse_selection("", 3).is_err());
    }

    #[test]
    fn scripted_session_collects_answers() {
        let input = "9\n1\n2,1\nall\ntau_pt:20:\n\n";
        let mut out = Vec::new();
        let mut p = Prompter::new(input.as_bytes(), &mut out);
        let catalog = SampleCatalog::builtin();
        let answers = ask_plot_answers(&mut p, &catalog, |_| {
            Ok(vec!["phiCP_a".to_string(), "phiCP_b".to_string()])
        })
        .unwrap();

        assert_eq!(answers.samples, vec!["cp-odd hadhad", "cp-even hadhad"]);
        assert_eq!(answers.branches, vec!["phiCP_a", "phiCP_b"]);
        assert_eq!(answers.y_branch, None);
        assert_eq!(answers.cuts, "tau_pt:20:");
        assert_eq!(answers.output, "result");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Invalid choice: '9'"));
    }

    #[test]
    fn eof_and_quit_cancel() {
        let mut p = Prompter::new("".as_bytes(), Vec::new());
        assert!(p.choose_one("t", &["a"]).is_err());
        let mut p = Prompter::new("q\n".as_bytes(), Vec::new());
        assert!(p.text("t", "d").is_err());
    }
}
