#![allow(clippy::uninlined_format_args)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use structopt::StructOpt;
use vimregex::{Error, Flags, LinePos, Match, MatchOptions, Regex};

#[derive(Debug, StructOpt)]
#[structopt(name = "vimregex-tool")]
struct Opt {
    /// The regular expression.
    pattern: String,

    /// Compile flags: i, M, z, Z, s.
    #[structopt(long, short, parse(from_str = Flags::from))]
    flags: Option<Flags>,

    /// Don't compute start hints.
    #[structopt(long)]
    no_opt: bool,

    /// Dump the compiled program to stdout.
    #[structopt(long)]
    dump_program: bool,

    /// Expand this template for each match.
    #[structopt(long, short)]
    substitute: Option<String>,

    /// Give up after this many steps.
    #[structopt(long)]
    max_steps: Option<u64>,

    /// The input values to match against.
    #[structopt(conflicts_with_all = &["bench", "file"])]
    inputs: Vec<String>,

    /// Match against the lines of a specified file. Matches may span lines.
    #[structopt(long, conflicts_with_all = &["bench", "inputs"])]
    file: Option<PathBuf>,

    /// Benchmark the matches of the specified file, line by line.
    #[structopt(long, conflicts_with_all = &["file", "inputs"])]
    bench: Option<PathBuf>,
}

fn format_match(r: &Match<usize>, input: &str) -> String {
    let mut result = format!("\"{}\" ({}..{})", &input[r.range()], r.start(), r.end());
    if r.captures.iter().any(Option::is_some) {
        result.push_str(", captures: [");
        for (i, cg) in r.captures.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            match cg {
                Some(cg) => {
                    result.push_str(&format!("\"{}\"", input.get(cg.clone()).unwrap_or("")))
                }
                None => result.push_str("None"),
            }
        }
        result.push(']');
    }
    result
}

fn format_pos(p: LinePos) -> String {
    format!("{}:{}", p.lnum + 1, p.col)
}

fn exec_re_on_string(re: &Regex, opt: &Opt, opts: &MatchOptions, input: &str) {
    match re.match_line_with(input, 0, opts) {
        Ok(Some(m)) => {
            let count = re
                .find_from_with(input, 0, opts.clone())
                .take_while(Result::is_ok)
                .count();
            println!("Match: {}, total: {}", format_match(&m, input), count);
            if let Some(template) = &opt.substitute {
                println!("Substitute: {}", re.substitute(&m, input, template, true, false));
            }
        }
        Ok(None) => println!("No match"),
        Err(err) => println!("Error: {}", err),
    }
}

fn exec_re_on_path(re: &Regex, opt: &Opt, opts: &MatchOptions, path: &Path) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            println!("{}: {}", err, path.display());
            return;
        }
    };
    let lines: Vec<&str> = contents.lines().collect();
    let mut total = 0;
    let mut lnum = 0;
    while lnum < lines.len() {
        let m = match re.match_buffer_with(&lines, lnum, lines.len() - lnum, 0, opts) {
            Ok(Some(m)) => m,
            Ok(None) => {
                lnum += 1;
                continue;
            }
            Err(err) => {
                println!("Error at line {}: {}", lnum + 1, err);
                return;
            }
        };
        total += 1;
        print!("Match: {}..{}", format_pos(m.start()), format_pos(m.end()));
        match &opt.substitute {
            Some(template) => println!(" -> {}", re.substitute_buffer(&m, &lines, template, true, false)),
            None => println!(),
        }
        lnum += m.lines();
    }
    println!("Total: {}", total);
}

fn bench_re_on_path(re: &Regex, opts: &MatchOptions, path: &Path) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            println!("{}: {}", err, path.display());
            return;
        }
    };
    let count = |re: &Regex| {
        contents
            .lines()
            .map(|line| re.find_from_with(line, 0, opts.clone()).count())
            .sum::<usize>()
    };
    // Warmup
    count(re);
    let start = Instant::now();
    for _ in 0..25 {
        count(re);
    }
    let duration = start.elapsed();
    println!("{} ms", duration.as_millis());
}

fn main() -> Result<(), Error> {
    let args = Opt::from_args();

    let mut flags = args.flags.unwrap_or_default();
    flags.no_opt |= args.no_opt;
    let re = Regex::with_flags(&args.pattern, flags)?;
    if args.dump_program {
        println!("Program:\n{}", re);
    }

    let mut opts = MatchOptions::with_ignore_case(flags.icase);
    if let Some(max_steps) = args.max_steps {
        opts.max_steps = max_steps;
    }

    if let Some(path) = &args.bench {
        bench_re_on_path(&re, &opts, path);
    } else if let Some(path) = &args.file {
        exec_re_on_path(&re, &args, &opts, path);
    } else {
        for input in &args.inputs {
            exec_re_on_string(&re, &args, &opts, input);
        }
    }
    Ok(())
}
