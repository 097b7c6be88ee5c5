//! The TodoMVC scenarios.
//!
//! Every scenario starts from a fresh session on the application root (see
//! [`before_each`]), runs its group hooks, then its own steps. Item names and
//! positions come from the scenario's random stream; expected counts are read
//! back from what the helpers report rather than assumed.

use crate::page::{FilterMode, TodoPage};
use crate::result::ProbeResult;
use crate::scenario::{Hook, Scenario, ScenarioContext};
use futures::future::BoxFuture;

/// Scenarios about creating items
pub const GROUP_ADDING: &str = "Adding items to the list";
/// Scenarios about deleting items
pub const GROUP_REMOVING: &str = "Removing items from the list";
/// Scenarios about completion state
pub const GROUP_MARKING: &str = "Marking items in the list";
/// Scenarios about the footer filters
pub const GROUP_FILTERING: &str = "Filtering items in the list";

/// Items added by the populate hook and by scenarios that need a full list
pub const LIST_SIZE: usize = 5;

/// Open the application root and capture its initial state
pub async fn before_each(ctx: &mut ScenarioContext, base_url: &str) -> ProbeResult<()> {
    ctx.step("Going to TodoMVC website");
    ctx.session.goto(base_url).await?;
    ctx.attach_screenshot("Initial state").await
}

/// Populate the list with [`LIST_SIZE`] generated items
#[must_use]
pub const fn populate_hook() -> Hook {
    Hook {
        name: "Populates list with random items",
        run: populate_list,
    }
}

/// Complete a random subset of the first [`LIST_SIZE`] items
#[must_use]
pub const fn mark_random_hook() -> Hook {
    Hook {
        name: "Marks random items as completed",
        run: mark_random_items,
    }
}

/// Every scenario, in reporting order
#[must_use]
pub fn todomvc_suite() -> Vec<Scenario> {
    let marking = [populate_hook()];
    let filtering = [populate_hook(), mark_random_hook()];
    vec![
        Scenario::new("Avoids adding an empty item", avoids_adding_empty_item).in_group(GROUP_ADDING),
        Scenario::new("Adds new item to the list", adds_new_item).in_group(GROUP_ADDING),
        Scenario::new("Removes an item from a full list", removes_item_from_full_list)
            .in_group(GROUP_REMOVING),
        Scenario::new(
            "Removes the last item of the list, letting it empty",
            removes_last_item,
        )
        .in_group(GROUP_REMOVING),
        Scenario::new("Marking an item in the list as completed", marks_item_completed)
            .in_group(GROUP_MARKING)
            .with_hooks(&marking),
        Scenario::new("Unmarking an item in the list back to active", unmarks_item)
            .in_group(GROUP_MARKING)
            .with_hooks(&marking),
        Scenario::new(
            "Marking all the items in the list at once as completed",
            marks_all_completed,
        )
        .in_group(GROUP_MARKING)
        .with_hooks(&marking),
        Scenario::new(
            "Unmarking all the items in the list at once back to active",
            unmarks_all,
        )
        .in_group(GROUP_MARKING)
        .with_hooks(&marking),
        Scenario::new("Filtering by completed items", filters_completed)
            .in_group(GROUP_FILTERING)
            .with_hooks(&filtering),
        Scenario::new("Filtering by active items", filters_active)
            .in_group(GROUP_FILTERING)
            .with_hooks(&filtering),
        Scenario::new("Clearing completed items", clears_completed),
        Scenario::new("Persisting items in the list on page reload", persists_on_reload),
    ]
}

// ============================================================================
// Hooks
// ============================================================================

fn populate_list(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        let names = ctx.data().populate(LIST_SIZE).await?;
        ctx.attach_text("Items added", names.join("\n"));
        ctx.attach_screenshot("New random items added").await
    })
}

fn mark_random_items(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        let marked = ctx.data().mark_random_subset_completed(LIST_SIZE).await?;
        ctx.attach_text("Number of items marked as completed", marked);
        ctx.attach_screenshot("Random items marked as completed").await
    })
}

// ============================================================================
// Adding items to the list
// ============================================================================

fn avoids_adding_empty_item(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Adds a random item to the list");
        let item = ctx.data().generate_item_name();
        ctx.attach_text("Item added", &item);
        ctx.todo().add_item(&item).await?;
        ctx.attach_screenshot("New item").await?;

        ctx.step("Counts number of items in the list");
        let count = ctx.session.count(&TodoPage::todo_items()).await?;
        ctx.attach_text("Number of items in the list", count);

        ctx.step("Attempts to add an empty item");
        ctx.todo().add_item("").await?;
        ctx.attach_screenshot("Attempt to add an empty item").await?;

        ctx.step(
            "Asserts empty item has not been added and the number of items in the list has not changed",
        );
        ctx.expect().item_count_matches(count).await?;
        ctx.expect().rendered_item_count(count).await
    })
}

fn adds_new_item(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Checks current number of items in the list");
        let before = ctx.session.count(&TodoPage::todo_items()).await?;

        ctx.step("Adds new item to the list");
        let item = ctx.data().generate_item_name();
        ctx.attach_text("Item value", &item);
        ctx.todo().add_item(&item).await?;
        ctx.attach_screenshot("Item added to list").await?;

        ctx.step("Asserts new item is the first one on the list");
        ctx.expect().item_created(&item).await?;

        ctx.step("Asserts item counter is updated");
        ctx.expect().item_count_matches(before + 1).await
    })
}

// ============================================================================
// Removing items from the list
// ============================================================================

fn removes_item_from_full_list(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Populates the list with multiple items");
        let _ = ctx.data().populate(LIST_SIZE).await?;
        ctx.attach_screenshot("New random items added").await?;

        ctx.step("Removes a random item from the list");
        let index = ctx.data().pick_index(LIST_SIZE).unwrap_or_default();
        ctx.attach_text("Item ID to remove", index);
        ctx.todo().remove_item(index).await?;
        ctx.fixture.item_count -= 1;
        ctx.attach_screenshot("Random item is removed").await?;

        ctx.step("Asserts the number of items has been decreased");
        let expected = ctx.fixture.item_count;
        ctx.expect().item_count_matches(expected).await?;
        ctx.expect().rendered_item_count(expected).await
    })
}

fn removes_last_item(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Populates the list with one item");
        let _ = ctx.data().populate(1).await?;
        ctx.attach_screenshot("New random item added").await?;

        ctx.step("Removes the last item from the list");
        ctx.todo().remove_item(0).await?;
        ctx.fixture.item_count -= 1;
        ctx.attach_screenshot("Last item is removed").await?;

        ctx.step("Asserts the list is empty");
        ctx.expect().counter_absent().await?;
        ctx.expect().rendered_item_count(0).await
    })
}

// ============================================================================
// Marking items in the list
// ============================================================================

async fn mark_random_item(ctx: &mut ScenarioContext) -> ProbeResult<usize> {
    let total = ctx.fixture.item_count;
    let index = ctx.data().pick_index(total).unwrap_or_default();
    ctx.attach_text("Item ID to mark", index);
    ctx.todo().set_item_completed(index, true).await?;
    ctx.fixture.completed_count += 1;
    ctx.attach_screenshot("Random item is marked as completed").await?;
    Ok(index)
}

fn marks_item_completed(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Marks a random item as completed in the list");
        let index = mark_random_item(ctx).await?;

        ctx.step("Asserts item text is risked");
        ctx.expect().item_marked_completed(index).await?;

        ctx.step("Asserts items left counter is decreased");
        let active = ctx.fixture.active_count();
        ctx.expect().item_count_matches(active).await
    })
}

fn unmarks_item(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Marks a random item as completed in the list");
        let index = mark_random_item(ctx).await?;

        ctx.step("Asserts item text is risked");
        ctx.expect().item_marked_completed(index).await?;

        ctx.step("Asserts items left counter is decreased");
        let active = ctx.fixture.active_count();
        ctx.expect().item_count_matches(active).await?;

        ctx.step("Unmarks the item previously marked");
        ctx.todo().set_item_completed(index, false).await?;
        ctx.fixture.completed_count -= 1;
        ctx.attach_screenshot("Item is unmarked back to active").await?;

        ctx.step("Asserts item text has default display");
        ctx.expect().item_marked_active(index).await?;

        ctx.step("Asserts item count is increased back");
        let active = ctx.fixture.active_count();
        ctx.expect().item_count_matches(active).await
    })
}

fn marks_all_completed(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Marks all items as completed");
        ctx.todo().set_all_completed(true).await?;
        ctx.fixture.completed_count = ctx.fixture.item_count;
        ctx.attach_screenshot("All items are marked as completed").await?;

        ctx.step("Asserts items left counter is 0");
        ctx.expect().item_count_matches(0).await?;
        for index in 0..ctx.fixture.item_count {
            ctx.expect().item_marked_completed(index).await?;
        }
        Ok(())
    })
}

fn unmarks_all(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Marks all items as completed");
        ctx.todo().set_all_completed(true).await?;
        ctx.fixture.completed_count = ctx.fixture.item_count;
        ctx.attach_screenshot("All items are marked as completed").await?;

        ctx.step("Unmarks all items back to active");
        ctx.todo().set_all_completed(false).await?;
        ctx.fixture.completed_count = 0;
        ctx.attach_screenshot("All items are unmarked back to active").await?;

        ctx.step("Asserts items left counter counts all of them");
        let total = ctx.fixture.item_count;
        ctx.expect().item_count_matches(total).await
    })
}

// ============================================================================
// Filtering items in the list
// ============================================================================

fn filters_completed(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Filters by completed items");
        ctx.todo().set_filter(FilterMode::Completed).await?;
        ctx.attach_screenshot("List filtered by completed items").await?;

        ctx.step("Asserts only completed items are shown");
        let completed = ctx.fixture.completed_count;
        ctx.expect().rendered_item_count(completed).await?;
        for index in 0..completed {
            ctx.expect().item_marked_completed(index).await?;
        }
        Ok(())
    })
}

fn filters_active(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Filters by active items");
        ctx.todo().set_filter(FilterMode::Active).await?;
        ctx.attach_screenshot("List filtered by active items").await?;

        ctx.step("Asserts only active items are shown");
        let active = ctx.fixture.active_count();
        ctx.expect().rendered_item_count(active).await?;
        for index in 0..active {
            ctx.expect().item_marked_active(index).await?;
        }
        Ok(())
    })
}

// ============================================================================
// Ungrouped
// ============================================================================

fn clears_completed(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Populates list with random items");
        let _ = ctx.data().populate(LIST_SIZE).await?;
        ctx.attach_screenshot("New random items added").await?;

        ctx.step("Marks random items as completed");
        let marked = ctx.data().mark_random_subset_completed(LIST_SIZE).await?;
        ctx.attach_text("Number of items marked as completed", marked);
        ctx.attach_screenshot("Random items marked as completed").await?;

        ctx.step("Clears completed items");
        if marked == 0 {
            // The control is only rendered while something is completed.
            ctx.attach_text("Clear skipped", "no item was marked as completed");
        } else {
            ctx.todo().clear_completed().await?;
            ctx.fixture.item_count -= marked;
            ctx.fixture.completed_count = 0;
        }
        ctx.attach_screenshot("Complete items cleared").await?;

        ctx.step("Asserts complete items were removed from the list");
        let remaining = ctx.fixture.item_count;
        ctx.expect().rendered_item_count(remaining).await?;
        let rendered = ctx.session.count(&TodoPage::todo_items()).await?;
        for index in 0..rendered {
            ctx.expect().item_marked_active(index).await?;
        }

        ctx.step("Asserts items left count was decreased");
        if remaining == 0 {
            ctx.expect().counter_absent().await
        } else {
            ctx.expect().item_count_matches(remaining).await
        }
    })
}

fn persists_on_reload(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
    Box::pin(async move {
        ctx.step("Adds new item to the list");
        let item = ctx.data().generate_item_name();
        ctx.attach_text("Item value", &item);
        ctx.todo().add_item(&item).await?;
        ctx.attach_screenshot("Item added to list").await?;

        ctx.step("Reload page");
        ctx.session.reload().await?;
        ctx.attach_screenshot("Page reloaded").await?;

        ctx.step("Asserts added item is still listed");
        ctx.expect().item_listed(&item).await
    })
}
