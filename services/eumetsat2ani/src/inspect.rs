//! Interactive post-mortem prompt for a failed run.

use std::io::{self, BufRead, Write};

use anyhow::Error;

use crate::pipeline::RunParams;

const HELP: &str = "\
Commands:
  chain      print the error and every cause
  backtrace  print the captured backtrace (set RUST_BACKTRACE=1 to capture)
  context    print the run parameters
  help       show this message
  quit       leave the prompt";

/// Prompt on the terminal until the user quits.
pub fn inspect_error(error: &Error, params: &RunParams) -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_prompt(error, params, stdin.lock(), stdout.lock())
}

/// Print the error chain, then answer commands read from `input` until
/// `quit` or end of input.
pub fn run_prompt<R: BufRead, W: Write>(
    error: &Error,
    params: &RunParams,
    input: R,
    mut output: W,
) -> io::Result<()> {
    writeln!(output, "Run failed. Entering inspection prompt.")?;
    write_chain(error, &mut output)?;
    writeln!(output, "{}", HELP)?;

    let mut lines = input.lines();
    loop {
        write!(output, "(inspect) ")?;
        output.flush()?;

        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        match line?.trim() {
            "" => {}
            "chain" | "c" => write_chain(error, &mut output)?,
            "backtrace" | "bt" => writeln!(output, "{}", error.backtrace())?,
            "context" | "ctx" => write_context(params, &mut output)?,
            "help" | "h" | "?" => writeln!(output, "{}", HELP)?,
            "quit" | "q" | "exit" => break,
            other => writeln!(output, "Unknown command: {} (try help)", other)?,
        }
    }

    Ok(())
}

fn write_chain<W: Write>(error: &Error, output: &mut W) -> io::Result<()> {
    for (depth, cause) in error.chain().enumerate() {
        writeln!(output, "  {}: {}", depth, cause)?;
    }
    Ok(())
}

fn write_context<W: Write>(params: &RunParams, output: &mut W) -> io::Result<()> {
    writeln!(output, "  collection:     {}", params.collection_id)?;
    writeln!(output, "  product:        {}", params.product)?;
    writeln!(output, "  area:           {}", params.area)?;
    writeln!(output, "  start:          {}", params.window.start)?;
    writeln!(output, "  end:            {}", params.window.end)?;
    writeln!(output, "  root:           {}", params.root.display())?;
    writeln!(output, "  frame duration: {:?}", params.frame_duration)?;
    writeln!(output, "  output:         {}", params.animation_path().display())?;
    Ok(())
}
