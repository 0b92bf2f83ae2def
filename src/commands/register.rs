//! Line-oriented sales entry for the terminal.

use std::fmt::Write as _;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use super::fit;
use crate::api::RemoteStore;
use crate::format::format_rupiah;
use crate::models::ProductSearchResult;
use crate::transaction::{
    CheckoutOutcome, NoticeKind, TransactionController, TransactionSnapshot, MIN_QUERY_CHARS,
};

const HELP: &str = "\
Commands:
  find <text>      search products by name or code
  add <n>          add result number n to the cart
  qty <id> <n>     set the quantity of a cart line
  rm <id>          remove a cart line
  cart             show the cart
  clear            empty the cart
  save             save the cart as a cash transaction
  help             show this list
  quit             leave the register
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterCommand {
    Find(String),
    Add(usize),
    Quantity { product_id: i64, quantity: u32 },
    Remove(i64),
    Cart,
    Clear,
    Save,
    Help,
    Quit,
}

impl FromStr for RegisterCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((line, ""));
        let args: Vec<&str> = rest.split_whitespace().collect();

        match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("find" | "search", _) if !rest.is_empty() => Ok(Self::Find(rest.to_string())),
            ("find" | "search", _) => Err("usage: find <text>".into()),
            ("add", [n]) => n
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .map(Self::Add)
                .ok_or_else(|| "usage: add <result number>".to_string()),
            ("qty", [id, n]) => match (id.parse::<i64>(), n.parse::<u32>()) {
                (Ok(product_id), Ok(quantity)) => Ok(Self::Quantity {
                    product_id,
                    quantity,
                }),
                _ => Err("usage: qty <product id> <quantity>".into()),
            },
            ("rm" | "remove", [id]) => id
                .parse::<i64>()
                .map(Self::Remove)
                .map_err(|_| "usage: rm <product id>".to_string()),
            ("cart", []) => Ok(Self::Cart),
            ("clear", []) => Ok(Self::Clear),
            ("save" | "checkout", []) => Ok(Self::Save),
            ("help" | "?", _) => Ok(Self::Help),
            ("quit" | "exit", _) => Ok(Self::Quit),
            ("", _) => Err(String::new()),
            (other, _) => Err(format!("unknown command {other:?}, type help")),
        }
    }
}

/// One-shot lookup for `toko-dashboard search`.
pub async fn search_once<S: RemoteStore + 'static>(store: Arc<S>, query: &str) -> String {
    let register = TransactionController::new(store);
    register.set_query(query);
    register.settle_search().await;
    render_results(query, &register.snapshot().results)
}

/// Read commands from `reader` until EOF or `quit`, writing screens to
/// `writer`.
pub async fn run_interactive<S, R, W>(store: Arc<S>, reader: R, mut writer: W) -> anyhow::Result<()>
where
    S: RemoteStore + 'static,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let register = TransactionController::new(store);
    let mut lines = reader.lines();

    write!(writer, "{HELP}")?;
    loop {
        write!(writer, "> ")?;
        writer.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match line.parse::<RegisterCommand>() {
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    writeln!(writer, "{message}")?;
                }
                continue;
            }
        };
        debug!(?command, "register command");

        let text = match command {
            RegisterCommand::Quit => break,
            RegisterCommand::Help => HELP.to_string(),
            RegisterCommand::Find(query) => {
                register.set_query(&query);
                register.settle_search().await;
                render_results(&query, &register.snapshot().results)
            }
            RegisterCommand::Add(n) => {
                let snap = register.snapshot();
                match snap.results.get(n - 1) {
                    Some(product) => {
                        register.add_to_cart(product);
                        render_cart(&register.snapshot())
                    }
                    None => format!("No result number {n}. Run find first.\n"),
                }
            }
            RegisterCommand::Quantity {
                product_id,
                quantity,
            } => {
                if register.update_quantity(product_id, quantity) {
                    render_cart(&register.snapshot())
                } else if quantity < 1 {
                    "Quantity must be at least 1. Use rm to drop a line.\n".to_string()
                } else {
                    format!("Product {product_id} is not in the cart.\n")
                }
            }
            RegisterCommand::Remove(product_id) => {
                register.remove_from_cart(product_id);
                render_cart(&register.snapshot())
            }
            RegisterCommand::Cart => render_cart(&register.snapshot()),
            RegisterCommand::Clear => {
                register.reset_cart();
                render_cart(&register.snapshot())
            }
            RegisterCommand::Save => match register.save_transaction().await {
                CheckoutOutcome::EmptyCart => "The cart is empty.\n".to_string(),
                CheckoutOutcome::InFlight => "A save is already in progress.\n".to_string(),
                CheckoutOutcome::Saved(_) | CheckoutOutcome::Failed(_) => {
                    render_cart(&register.snapshot())
                }
            },
        };
        write!(writer, "{text}")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn render_results(query: &str, results: &[ProductSearchResult]) -> String {
    if query.chars().count() < MIN_QUERY_CHARS {
        return format!("Type at least {MIN_QUERY_CHARS} characters to search.\n");
    }
    if results.is_empty() {
        return format!("No products match {query:?}.\n");
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:>6}  {} {:>14} {:>6}",
        "#",
        "ID",
        fit("Product", 30),
        "Price",
        "Stock"
    );
    for (i, product) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}  {:>6}  {} {:>14} {:>6}",
            i + 1,
            product.id,
            fit(&product.name, 30),
            format_rupiah(product.unit_price),
            product.stock_level
        );
    }
    out
}

pub fn render_cart(snap: &TransactionSnapshot) -> String {
    let mut out = String::new();
    if let Some(notice) = &snap.notice {
        let tag = match notice.kind {
            NoticeKind::Success => "OK",
            NoticeKind::Error => "ERROR",
        };
        let _ = writeln!(out, "[{tag}] {}", notice.text);
    }
    if snap.cart.is_empty() {
        out.push_str("Cart is empty.\n");
        return out;
    }
    for line in snap.cart.lines() {
        let _ = writeln!(
            out,
            "{:>6}  {} {:>4} x {:>12} = {:>14}",
            line.product_id,
            fit(&line.name, 30),
            line.quantity,
            format_rupiah(line.unit_price),
            format_rupiah(line.line_total)
        );
    }
    let _ = writeln!(out, "Total: {}", format_rupiah(snap.total()));
    out
}
