use crate::db::MenuRow;
use crate::models::ReportInstance;

/// Wrapper around the saved-instance list shown on the main screen.
pub(crate) struct InstanceListScreen {
    pub(crate) instances: Vec<ReportInstance>,
    pub(crate) filtered_instances: Vec<ReportInstance>,
    pub(crate) filter: Option<String>,
    pub(crate) selected: usize,
}

impl InstanceListScreen {
    pub(crate) fn new(instances: Vec<ReportInstance>) -> Self {
        let mut screen = Self {
            filtered_instances: Vec::new(),
            instances,
            filter: None,
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    /// Case-insensitive match against the title, report key, or description.
    pub(crate) fn apply_filter(&mut self) {
        self.filtered_instances = if let Some(query) = &self.filter {
            let needle = query.to_lowercase();
            if needle.trim().is_empty() {
                self.instances.clone()
            } else {
                self.instances
                    .iter()
                    .filter(|instance| {
                        instance.title.to_lowercase().contains(&needle)
                            || instance.report_id.to_lowercase().contains(&needle)
                            || instance
                                .description
                                .as_deref()
                                .is_some_and(|d| d.to_lowercase().contains(&needle))
                    })
                    .cloned()
                    .collect()
            }
        } else {
            self.instances.clone()
        };

        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter;
        self.apply_filter();
    }

    pub(crate) fn current_instance(&self) -> Option<&ReportInstance> {
        self.filtered_instances.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.filtered_instances.is_empty() {
            return;
        }
        let len = self.filtered_instances.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.filtered_instances.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.filtered_instances.is_empty() {
            self.selected = self.filtered_instances.len() - 1;
        }
    }

    pub(crate) fn set_instances(&mut self, instances: Vec<ReportInstance>) {
        self.instances = instances;
        self.apply_filter();
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.filtered_instances.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered_instances.len() {
            self.selected = self.filtered_instances.len() - 1;
        }
    }
}

/// State for the navigation-menu screen: the flattened tree plus whether the
/// rows came from the warm cache or a fresh rebuild.
pub(crate) struct NavigationScreen {
    pub(crate) rows: Vec<MenuRow>,
    pub(crate) cache_was_warm: bool,
    pub(crate) selected: usize,
}

impl NavigationScreen {
    pub(crate) fn new(rows: Vec<MenuRow>, cache_was_warm: bool) -> Self {
        Self {
            rows,
            cache_was_warm,
            selected: 0,
        }
    }

    pub(crate) fn current_row(&self) -> Option<&MenuRow> {
        self.rows.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.rows.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.rows.is_empty() {
            self.selected = self.rows.len() - 1;
        }
    }

    pub(crate) fn set_rows(&mut self, rows: Vec<MenuRow>, cache_was_warm: bool) {
        self.rows = rows;
        self.cache_was_warm = cache_was_warm;
        if self.rows.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.rows.len() {
            self.selected = self.rows.len() - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: i64, title: &str, report_id: &str, description: Option<&str>) -> ReportInstance {
        ReportInstance {
            id,
            report_id: report_id.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            email_subject: None,
            email_to: None,
            email_cc: None,
            header: None,
            footer: None,
            row_count: None,
            cache_minutes: 60,
            is_dashboard: false,
            is_reserved: false,
            permission: None,
            grouprole: None,
            navigation_id: None,
            drilldown_id: None,
            owner_id: None,
            form_values: None,
        }
    }

    #[test]
    fn filter_matches_title_key_and_description() {
        let mut screen = InstanceListScreen::new(vec![
            instance(1, "Donor Summary", "contribute/summary", None),
            instance(2, "Event Income", "event/income", Some("Totals per event")),
            instance(3, "Members", "member/lapse", None),
        ]);

        screen.set_filter(Some("DONOR".to_string()));
        assert_eq!(screen.filtered_instances.len(), 1);
        assert_eq!(screen.current_instance().unwrap().id, 1);

        screen.set_filter(Some("event".to_string()));
        assert_eq!(screen.filtered_instances.len(), 1);

        screen.set_filter(Some("totals".to_string()));
        assert_eq!(screen.filtered_instances.len(), 1);
        assert_eq!(screen.current_instance().unwrap().id, 2);

        screen.set_filter(None);
        assert_eq!(screen.filtered_instances.len(), 3);
    }

    #[test]
    fn selection_stays_clamped_when_the_filter_shrinks() {
        let mut screen = InstanceListScreen::new(vec![
            instance(1, "A", "a", None),
            instance(2, "B", "b", None),
            instance(3, "C", "c", None),
        ]);

        screen.move_selection(10);
        assert_eq!(screen.selected, 2);

        screen.set_filter(Some("a".to_string()));
        assert_eq!(screen.selected, 0);

        screen.move_selection(-5);
        assert_eq!(screen.selected, 0);
    }
}
