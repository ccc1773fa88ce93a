use std::fmt::Write as _;

use grounding::model::format_price;
use grounding::{Budget, CatalogSnapshot};
use mcp_common::openai::Message;

const DOMAIN_KNOWLEDGE: &str = "\
You are a food ordering concierge. Recommend only restaurants and dishes from the \
catalog below; never invent names or prices. Prices are in Bahraini dinar (BD) with \
three decimal places. Keep answers short and friendly.";

/// Everything one prompt is built from. Borrowed; nothing here is owned by the turn.
pub struct PromptContext<'a> {
    pub user_message: &'a str,
    pub history: &'a [Message],
    pub snapshot: &'a CatalogSnapshot,
    pub budget: Option<Budget>,
    pub price_sensitive: bool,
    pub history_limit: usize,
    pub suffix: &'a str,
}

pub fn assemble_prompt(ctx: &PromptContext<'_>) -> Vec<Message> {
    let mut system = String::from(DOMAIN_KNOWLEDGE);
    system.push_str("\n\n");
    write_format_guidance(&mut system, ctx.suffix);
    write_catalog(&mut system, ctx.snapshot);

    if let Some(orders) = ctx.snapshot.recent_orders.as_deref().filter(|o| !o.is_empty()) {
        system.push_str("\nThe user recently ordered:\n");
        for order in orders {
            let _ = writeln!(system, "- {order}");
        }
    }

    if let Some(budget) = ctx.budget {
        let _ = write!(
            system,
            "\nThe user's budget is {}. Only suggest items priced at or below it.\n",
            format_price(budget.ceiling())
        );
    } else if ctx.price_sensitive {
        system.push_str("\nThe user is price conscious. Favour the cheaper options.\n");
    }

    let skip = ctx.history.len().saturating_sub(ctx.history_limit);
    let mut messages = Vec::with_capacity(ctx.history.len() - skip + 2);
    messages.push(Message::system(system));
    messages.extend(ctx.history[skip..].iter().cloned());
    messages.push(Message::user(ctx.user_message));
    messages
}

fn write_format_guidance(out: &mut String, suffix: &str) {
    let _ = writeln!(
        out,
        "When listing restaurants, write every restaurant name in full ending with \"{suffix}\" \
exactly as it appears in the catalog. When listing dishes, use numbered entries:\n\
1. **Restaurant Name {suffix}**\n   - **Dish:** Dish Name (BD 0.000)\n"
    );
}

fn write_catalog(out: &mut String, snapshot: &CatalogSnapshot) {
    if snapshot.is_empty() {
        out.push_str("The catalog is currently empty. Say so and do not recommend anything.\n");
        return;
    }

    out.push_str("Restaurants:\n");
    for r in &snapshot.restaurants {
        let _ = write!(out, "- {}", r.name);
        if !r.category.is_empty() {
            let _ = write!(out, " [{}]", r.category);
        }
        if !r.cuisine_tags.is_empty() {
            let tags: Vec<&str> = r.cuisine_tags.iter().map(String::as_str).collect();
            let _ = write!(out, " ({})", tags.join(", "));
        }
        if let Some(rating) = r.rating {
            let _ = write!(out, " rating {rating:.1}");
        }
        let _ = writeln!(out, ", min order {}", format_price(r.min_order));
    }

    out.push_str("\nDishes:\n");
    for d in snapshot.dishes.iter().filter(|d| d.is_available) {
        let restaurant = snapshot
            .restaurant(&d.restaurant_id)
            .map(|r| r.name.as_str())
            .unwrap_or("unknown restaurant");
        let _ = writeln!(out, "- {} at {restaurant}: {}", d.name, format_price(d.price));
    }
}
