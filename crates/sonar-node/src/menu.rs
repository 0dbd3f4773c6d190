//! Interactive text menu

use anyhow::Result;
use sonar_network::{Node, Transport};
use sonar_wire::SearchMode;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

const PROMPT: &str = "
Choose a command
    [0] List neighbours
    [1] HELLO
    [2] SEARCH (flooding)
    [3] SEARCH (random walk)
    [4] SEARCH (depth-first)
    [5] Statistics
    [6] Change default TTL
    [9] Quit
";

/// What the menu loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Show the prompt again
    Continue,
    /// Leave the overlay
    Quit,
}

/// Menu reading commands from `R` and writing to `W`.
pub struct Menu<'a, T: Transport, R, W> {
    node: &'a Node<T>,
    input: Lines<R>,
    out: W,
}

impl<'a, T, R, W> Menu<'a, T, R, W>
where
    T: Transport,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Create a menu driving `node`
    pub fn new(node: &'a Node<T>, input: R, out: W) -> Self {
        Self {
            node,
            input: input.lines(),
            out,
        }
    }

    /// Run until `9` or end of input
    pub async fn run(&mut self) -> Result<()> {
        loop {
            write!(self.out, "{}", PROMPT)?;
            self.out.flush()?;
            let choice = match self.input.next_line().await? {
                Some(line) => line,
                None => return Ok(()),
            };
            if self.dispatch(choice.trim()).await? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Execute one menu choice
    pub async fn dispatch(&mut self, choice: &str) -> Result<Flow> {
        match choice {
            "0" => self.list_neighbours()?,
            "1" => self.hello().await?,
            "2" => self.search(SearchMode::Flooding).await?,
            "3" => self.search(SearchMode::RandomWalk).await?,
            "4" => self.search(SearchMode::Backtracking).await?,
            "5" => self.stats()?,
            "6" => self.change_ttl().await?,
            "9" => {
                writeln!(self.out, "Leaving...")?;
                return Ok(Flow::Quit);
            }
            "" => {}
            other => writeln!(self.out, "Unknown command: {}", other)?,
        }
        Ok(Flow::Continue)
    }

    async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        writeln!(self.out, "{}", question)?;
        self.out.flush()?;
        Ok(self
            .input
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }

    fn list_neighbours(&mut self) -> Result<()> {
        let neighbours = self.node.neighbours();
        writeln!(
            self.out,
            "There are {} neighbours in the table:",
            neighbours.len()
        )?;
        for (index, neighbour) in neighbours.iter().enumerate() {
            writeln!(
                self.out,
                "    [{}] {} {}",
                index,
                neighbour.host(),
                neighbour.port()
            )?;
        }
        Ok(())
    }

    async fn hello(&mut self) -> Result<()> {
        self.list_neighbours()?;
        if self.node.neighbours().is_empty() {
            return Ok(());
        }
        let answer = match self.ask("Choose a neighbour:").await? {
            Some(answer) => answer,
            None => return Ok(()),
        };
        let index = match answer.parse::<usize>() {
            Ok(index) => index,
            Err(_) => {
                writeln!(self.out, "Invalid neighbour index: {}", answer)?;
                return Ok(());
            }
        };
        match self.node.hello_neighbour(index).await {
            Ok(outcome) if outcome.success => writeln!(self.out, "HELLO sent")?,
            Ok(_) => writeln!(self.out, "HELLO could not be delivered")?,
            Err(e) => writeln!(self.out, "{}", e)?,
        }
        Ok(())
    }

    async fn search(&mut self, mode: SearchMode) -> Result<()> {
        let key = match self.ask("Enter the key to search for:").await? {
            Some(key) => key,
            None => return Ok(()),
        };
        match self.node.search(mode, &key).await {
            Ok(outcome) => match outcome.value {
                Some(value) => writeln!(self.out, "Value found locally: {}", value)?,
                None => writeln!(self.out, "{} search for {} started", mode.name(), key)?,
            },
            Err(e) => writeln!(self.out, "Cannot search for {:?}: {}", key, e)?,
        }
        Ok(())
    }

    fn stats(&mut self) -> Result<()> {
        let stats = self.node.stats();
        writeln!(self.out, "Statistics")?;
        for mode in SearchMode::ALL {
            writeln!(
                self.out,
                "    {}: {} messages seen, {} resolved, mean {:.2} hops",
                mode.name(),
                stats.hits(mode),
                stats.resolved(mode),
                stats.mean_hops(mode)
            )?;
        }
        Ok(())
    }

    async fn change_ttl(&mut self) -> Result<()> {
        let answer = match self.ask("Enter the new default TTL:").await? {
            Some(answer) => answer,
            None => return Ok(()),
        };
        match answer.parse::<u32>() {
            Ok(ttl) if ttl > 0 => {
                self.node.set_default_ttl(ttl);
                writeln!(self.out, "Default TTL is now {}", ttl)?;
            }
            _ => writeln!(self.out, "Invalid TTL: {}", answer)?,
        }
        Ok(())
    }
}
