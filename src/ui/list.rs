/// Reseña list: search filter and empty state
use iced::widget::{container, text, Column};
use iced::{Element, Length};

use crate::state::data::Resena;

/// Records whose number contains `term`, ignoring case, in their original order
pub fn filter<'a>(resenas: &'a [Resena], term: &str) -> Vec<&'a Resena> {
    let term = term.to_lowercase();
    resenas
        .iter()
        .filter(|r| r.num.to_lowercase().contains(&term))
        .collect()
}

/// What the list area shows for a filtered set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListLayout {
    NoResults,
    /// Card ids in display order
    Cards(Vec<i64>),
}

pub fn layout(visible: &[&Resena]) -> ListLayout {
    if visible.is_empty() {
        ListLayout::NoResults
    } else {
        ListLayout::Cards(visible.iter().map(|r| r.id).collect())
    }
}

/// Render the list, one element per card id produced by `card`
pub fn view<'a, Message: 'a>(
    visible: &[&Resena],
    mut card: impl FnMut(i64) -> Option<Element<'a, Message>>,
) -> Element<'a, Message> {
    match layout(visible) {
        ListLayout::NoResults => container(text("No se han encontrado reseñas").size(18))
            .width(Length::Fill)
            .center_x(Length::Fill)
            .padding(40)
            .into(),
        ListLayout::Cards(ids) => {
            Column::with_children(ids.into_iter().filter_map(&mut card))
                .spacing(30)
                .width(Length::Fill)
                .into()
        }
    }
}
